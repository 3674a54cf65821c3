//! Host/DRAM clock-domain bridge.
//!
//! Both periods are integer picoseconds reduced by their GCD once at construction, so deciding
//! when the engine ticks never touches floating point.

use serde::{Deserialize, Serialize};

const PS_PER_US: u64 = 1_000_000;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// One engine tick per controller tick.
    #[default]
    Lockstep,
    /// Engine ticks follow the reduced host/memory period ratio.
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockRatio {
    host_tick_ps: u64,
    mem_tick_ps: u64,
    gcd: u64,
    host_ticks: u64,
    mem_ticks: u64,
}

impl ClockRatio {
    pub fn new(cpu_freq_mhz: u64, mem_tick_ps: u64) -> Self {
        assert!(cpu_freq_mhz > 0, "cpu frequency must be > 0");
        assert!(mem_tick_ps > 0, "memory tCK must be > 0");
        let host_tick_ps = PS_PER_US / cpu_freq_mhz;
        assert!(host_tick_ps > 0, "cpu frequency {cpu_freq_mhz} MHz exceeds 1 ps resolution");
        let gcd = num::integer::gcd(host_tick_ps, mem_tick_ps);
        Self {
            host_tick_ps,
            mem_tick_ps,
            gcd,
            host_ticks: host_tick_ps / gcd,
            mem_ticks: mem_tick_ps / gcd,
        }
    }

    pub fn host_tick_ps(&self) -> u64 {
        self.host_tick_ps
    }

    pub fn mem_tick_ps(&self) -> u64 {
        self.mem_tick_ps
    }

    pub fn gcd(&self) -> u64 {
        self.gcd
    }

    /// Reduced host period.
    pub fn host_ticks(&self) -> u64 {
        self.host_ticks
    }

    /// Reduced memory period.
    pub fn mem_ticks(&self) -> u64 {
        self.mem_ticks
    }

    pub fn host_freq_mhz(&self) -> f64 {
        PS_PER_US as f64 / self.host_tick_ps as f64
    }

    pub fn mem_freq_mhz(&self) -> f64 {
        PS_PER_US as f64 / self.mem_tick_ps as f64
    }

    /// Host cycles per memory cycle, rounded up.
    pub fn freq_ratio(&self) -> u64 {
        self.mem_ticks.div_ceil(self.host_ticks)
    }
}

/// Decides, per host tick, how many engine ticks are due.
#[derive(Debug, Clone)]
pub struct ClockBridge {
    ratio: ClockRatio,
    mode: ClockMode,
    acc: u64,
}

impl ClockBridge {
    pub fn new(ratio: ClockRatio, mode: ClockMode) -> Self {
        Self {
            ratio,
            mode,
            acc: 0,
        }
    }

    pub fn ratio(&self) -> &ClockRatio {
        &self.ratio
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn due_mem_ticks(&mut self) -> u64 {
        match self.mode {
            ClockMode::Lockstep => 1,
            ClockMode::Ratio => {
                self.acc += self.ratio.host_ticks;
                let due = self.acc / self.ratio.mem_ticks;
                self.acc %= self.ratio.mem_ticks;
                due
            }
        }
    }

    pub fn reset(&mut self) {
        self.acc = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_reduces_by_gcd() {
        // 2 GHz host (500 ps) against DDR4-2400 (833 ps)
        let ratio = ClockRatio::new(2000, 833);
        assert_eq!(500, ratio.host_tick_ps());
        assert_eq!(1, ratio.gcd());
        assert_eq!((500, 833), (ratio.host_ticks(), ratio.mem_ticks()));
        assert_eq!(2, ratio.freq_ratio());

        // 2 GHz host (500 ps) against DDR3-1600 (1250 ps)
        let ratio = ClockRatio::new(2000, 1250);
        assert_eq!(250, ratio.gcd());
        assert_eq!((2, 5), (ratio.host_ticks(), ratio.mem_ticks()));
        assert_eq!(3, ratio.freq_ratio());
        assert!((ratio.mem_freq_mhz() - 800.0).abs() < 1e-9);
    }

    #[test]
    fn lockstep_always_one() {
        let mut bridge = ClockBridge::new(ClockRatio::new(2000, 1250), ClockMode::Lockstep);
        for _ in 0..10 {
            assert_eq!(1, bridge.due_mem_ticks());
        }
    }

    #[test]
    fn ratio_mode_has_no_drift() {
        let mut bridge = ClockBridge::new(ClockRatio::new(2000, 1250), ClockMode::Ratio);
        let total: u64 = (0..5000).map(|_| bridge.due_mem_ticks()).sum();
        // 5000 host cycles of 500 ps = 2.5 us = 2000 cycles of 1250 ps
        assert_eq!(2000, total);
    }

    #[test]
    fn ratio_mode_faster_memory_ticks_more_than_once() {
        // 1 GHz host (1000 ps) against 400 ps memory clock
        let mut bridge = ClockBridge::new(ClockRatio::new(1000, 400), ClockMode::Ratio);
        let due: Vec<u64> = (0..4).map(|_| bridge.due_mem_ticks()).collect();
        assert_eq!(vec![2, 3, 2, 3], due);
    }

    #[test]
    #[should_panic(expected = "cpu frequency must be > 0")]
    fn zero_frequency_is_rejected() {
        let _ = ClockRatio::new(0, 1250);
    }
}
