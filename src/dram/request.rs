use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Deserialize;
use std::str::FromStr;

use crate::timeq::Cycle;

/// Request types arriving from the cache hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemReqKind {
    /// Shared read.
    GetS = 0,
    /// Exclusive read.
    GetX = 1,
    /// Clean downgrade; carries no data.
    PutS = 2,
    /// Dirty writeback.
    PutX = 3,
}

impl MemReqKind {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }

    pub fn is_downgrade(self) -> bool {
        matches!(self, Self::PutS)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::PutX)
    }
}

impl FromStr for MemReqKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "GETS" => Ok(Self::GetS),
            "GETX" => Ok(Self::GetX),
            "PUTS" => Ok(Self::PutS),
            "PUTX" => Ok(Self::PutX),
            _ => value
                .parse::<u32>()
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| {
                    format!(
                        "unknown memory request type '{}', expected one of: GETS, GETX, PUTS, PUTX, 0-3",
                        value
                    )
                }),
        }
    }
}

/// Coherence state of the requesting cache's copy of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MesiState {
    #[default]
    I,
    S,
    E,
    M,
}

/// Access as issued by the requesting side.  The controller writes the resulting coherence state
/// back into `state`.
#[derive(Debug, Clone)]
pub struct MemReq {
    pub line_addr: u64,
    pub kind: MemReqKind,
    pub cycle: Cycle,
    pub state: MesiState,
    pub no_excl: bool,
    pub src_id: u32,
}

impl MemReq {
    pub fn new(kind: MemReqKind, line_addr: u64, cycle: Cycle, src_id: u32) -> Self {
        Self {
            line_addr,
            kind,
            cycle,
            state: MesiState::I,
            no_excl: false,
            src_id,
        }
    }

    pub fn with_no_excl(mut self, no_excl: bool) -> Self {
        self.no_excl = no_excl;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DramRequestKind {
    Read,
    Write,
}

impl DramRequestKind {
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Request as handed to the DRAM engine and returned by it on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramRequest {
    pub addr: u64,
    pub kind: DramRequestKind,
    pub core_id: u32,
}

impl DramRequest {
    pub fn new(addr: u64, kind: DramRequestKind, core_id: u32) -> Self {
        Self {
            addr,
            kind,
            core_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_names_and_codes() {
        assert_eq!(Ok(MemReqKind::GetS), "gets".parse());
        assert_eq!(Ok(MemReqKind::PutX), "PUTX".parse());
        assert_eq!(Ok(MemReqKind::GetX), "1".parse());
        assert!("7".parse::<MemReqKind>().is_err());
        assert!("READ".parse::<MemReqKind>().is_err());
    }

    #[test]
    fn only_puts_is_downgrade() {
        assert!(MemReqKind::PutS.is_downgrade());
        assert!(!MemReqKind::PutX.is_downgrade());
        assert!(MemReqKind::PutX.is_write());
        assert!(!MemReqKind::GetX.is_write());
    }
}
