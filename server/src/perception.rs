//! Cadence-gated threat perception. Each agent keeps its own registry of
//! candidate target ids; the whole set is rebuilt on scan, never touched
//! between scans.

use shared::Vec3;

/// One candidate the scanner can see, already filtered to the threat layer
/// by the caller.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: u32,
    pub position: Vec3,
    pub is_dead: bool,
    /// Per-target attack range override, when the target carries one.
    pub attack_range: Option<f32>,
}

#[derive(Debug)]
pub struct ThreatRegistry {
    threats: Vec<u32>,
    last_scan: f32,
    scan_frequency: f32,
}

impl ThreatRegistry {
    pub fn new(scan_frequency: f32) -> Self {
        Self {
            threats: Vec::new(),
            last_scan: 0.0,
            scan_frequency,
        }
    }

    /// Whether enough time has passed since the last scan. Cadence is
    /// agent-local; callers may tick far faster than this fires.
    pub fn due(&self, now: f32) -> bool {
        now - self.last_scan >= self.scan_frequency
    }

    pub fn threats(&self) -> &[u32] {
        &self.threats
    }

    pub fn contains(&self, id: u32) -> bool {
        self.threats.contains(&id)
    }

    /// Rebuilds the set: dead and now-out-of-range entries are pruned here
    /// and only here, then every live candidate within sight is added.
    /// Squared-distance comparison, no square root.
    pub fn scan(&mut self, now: f32, origin: Vec3, candidates: &[Candidate], sight_range: f32) {
        let range_sq = sight_range * sight_range;

        self.threats.retain(|id| {
            candidates.iter().any(|c| {
                c.id == *id
                    && !c.is_dead
                    && origin.flat_distance_squared(&c.position) < range_sq
            })
        });

        for candidate in candidates {
            if candidate.is_dead {
                continue;
            }
            if origin.flat_distance_squared(&candidate.position) < range_sq
                && !self.threats.contains(&candidate.id)
            {
                self.threats.push(candidate.id);
            }
        }

        self.last_scan = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, x: f32, z: f32) -> Candidate {
        Candidate {
            id,
            position: Vec3::new(x, 0.0, z),
            is_dead: false,
            attack_range: None,
        }
    }

    #[test]
    fn scan_adds_only_targets_within_sight() {
        let mut registry = ThreatRegistry::new(1.0);
        let candidates = [candidate(1, 3.0, 0.0), candidate(2, 20.0, 0.0)];

        registry.scan(1.0, Vec3::default(), &candidates, 12.0);
        assert!(registry.contains(1));
        assert!(!registry.contains(2));
    }

    #[test]
    fn scan_cadence_gates_rescans() {
        let registry = ThreatRegistry::new(1.0);
        assert!(!registry.due(0.5));
        assert!(registry.due(1.0));

        let mut registry = ThreatRegistry::new(1.0);
        registry.scan(1.0, Vec3::default(), &[], 12.0);
        assert!(!registry.due(1.5));
        assert!(registry.due(2.0));
    }

    #[test]
    fn ticking_faster_than_cadence_does_not_rescan() {
        let mut registry = ThreatRegistry::new(1.0);
        let mut approaching = candidate(1, 30.0, 0.0);

        let mut now = 0.0;
        let mut scans = 0;
        for _ in 0..100 {
            now += 0.05;
            // The target walks into sight partway through.
            approaching.position.x -= 0.5;
            if registry.due(now) {
                registry.scan(now, Vec3::default(), &[approaching], 12.0);
                scans += 1;
            }
        }
        assert_eq!(scans, 5);
    }

    #[test]
    fn dead_and_out_of_range_pruned_at_scan_time() {
        let mut registry = ThreatRegistry::new(1.0);
        let mut target = candidate(1, 3.0, 0.0);

        registry.scan(1.0, Vec3::default(), &[target], 12.0);
        assert!(registry.contains(1));

        // Nothing leaves between scans.
        target.position.x = 50.0;
        assert!(registry.contains(1));

        registry.scan(2.0, Vec3::default(), &[target], 12.0);
        assert!(!registry.contains(1));

        target.position.x = 3.0;
        registry.scan(3.0, Vec3::default(), &[target], 12.0);
        assert!(registry.contains(1));

        target.is_dead = true;
        registry.scan(4.0, Vec3::default(), &[target], 12.0);
        assert!(!registry.contains(1));
    }
}
