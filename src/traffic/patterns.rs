use anyhow::{bail, ensure};
use rand::rngs::StdRng;
use rand::Rng;

use crate::dram::request::MemReqKind;
use crate::traffic::config::{PatternKind, TrafficMix, TrafficPatternSpec};
use crate::traffic::source::TrafficItem;

fn pick_kind(mix: &TrafficMix, rng: &mut StdRng) -> MemReqKind {
    let mut roll = rng.gen_range(0..mix.total());
    for (weight, kind) in [
        (mix.gets, MemReqKind::GetS),
        (mix.getx, MemReqKind::GetX),
        (mix.puts, MemReqKind::PutS),
        (mix.putx, MemReqKind::PutX),
    ] {
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    unreachable!("roll below total weight")
}

/// Expand one pattern into timed requests.  Random address and kind draws come from `rng`, so a
/// fixed seed reproduces the same stream.
pub fn expand(spec: &TrafficPatternSpec, rng: &mut StdRng) -> anyhow::Result<Vec<TrafficItem>> {
    ensure!(
        spec.mix.total() > 0,
        "pattern '{}' has an all-zero request mix",
        spec.name
    );
    if spec.kind == PatternKind::Random && spec.span == 0 {
        bail!("random pattern '{}' needs span > 0", spec.name);
    }

    let mut items = Vec::with_capacity(spec.count as usize);
    for i in 0..spec.count {
        let line_addr = match spec.kind {
            PatternKind::Sequential => spec.base_line + i,
            PatternKind::Strided => spec.base_line + i * spec.stride,
            PatternKind::Random => spec.base_line + rng.gen_range(0..spec.span),
        };
        items.push(TrafficItem {
            cycle: spec.start_cycle + i * spec.interval,
            kind: pick_kind(&spec.mix, rng),
            line_addr,
            src_id: spec.src_id,
            no_excl: spec.no_excl,
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn reads_only() -> TrafficMix {
        TrafficMix {
            gets: 1,
            getx: 0,
            puts: 0,
            putx: 0,
        }
    }

    #[test]
    fn strided_addresses_and_spacing() {
        let spec = TrafficPatternSpec {
            kind: PatternKind::Strided,
            start_cycle: 10,
            interval: 4,
            count: 3,
            base_line: 0x100,
            stride: 8,
            mix: reads_only(),
            ..TrafficPatternSpec::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let items = expand(&spec, &mut rng).unwrap();
        let lines: Vec<u64> = items.iter().map(|it| it.line_addr).collect();
        let cycles: Vec<u64> = items.iter().map(|it| it.cycle).collect();
        assert_eq!(vec![0x100, 0x108, 0x110], lines);
        assert_eq!(vec![10, 14, 18], cycles);
        assert!(items.iter().all(|it| it.kind == MemReqKind::GetS));
    }

    #[test]
    fn random_is_seeded_and_bounded() {
        let spec = TrafficPatternSpec {
            kind: PatternKind::Random,
            count: 200,
            base_line: 1000,
            span: 16,
            ..TrafficPatternSpec::default()
        };
        let a = expand(&spec, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = expand(&spec, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|it| (1000..1016).contains(&it.line_addr)));
        // default mix is 3:1 reads to writebacks
        assert!(a.iter().any(|it| it.kind == MemReqKind::GetS));
        assert!(a.iter().any(|it| it.kind == MemReqKind::PutX));
        assert!(a.iter().all(|it| matches!(it.kind, MemReqKind::GetS | MemReqKind::PutX)));
    }

    #[test]
    fn degenerate_patterns_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let empty_mix = TrafficPatternSpec {
            mix: TrafficMix {
                gets: 0,
                getx: 0,
                puts: 0,
                putx: 0,
            },
            ..TrafficPatternSpec::default()
        };
        assert!(expand(&empty_mix, &mut rng).is_err());
        let no_span = TrafficPatternSpec {
            kind: PatternKind::Random,
            span: 0,
            ..TrafficPatternSpec::default()
        };
        assert!(expand(&no_span, &mut rng).is_err());
    }
}
