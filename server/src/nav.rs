//! Navigation boundary. The behavior layer only decides *where* an agent
//! should go; continuous path correction belongs to an external steering
//! engine. [`DirectNavigator`] is the minimal stand-in: straight-line
//! steering at the agent's move speed, no avoidance.

use std::collections::HashMap;

use shared::Vec3;

pub trait Navigator: Send {
    fn set_destination(&mut self, agent_id: u32, destination: Vec3);
    fn clear_destination(&mut self, agent_id: u32);
    /// Advances steering and returns the new position for each moving agent.
    fn steer(&mut self, positions: &HashMap<u32, Vec3>, dt: f32) -> Vec<(u32, Vec3)>;
}

pub struct DirectNavigator {
    destinations: HashMap<u32, Vec3>,
    speeds: HashMap<u32, f32>,
}

impl DirectNavigator {
    pub fn new() -> Self {
        Self {
            destinations: HashMap::new(),
            speeds: HashMap::new(),
        }
    }

    pub fn register_agent(&mut self, agent_id: u32, move_speed: f32) {
        self.speeds.insert(agent_id, move_speed);
    }

    pub fn remove_agent(&mut self, agent_id: u32) {
        self.destinations.remove(&agent_id);
        self.speeds.remove(&agent_id);
    }
}

impl Default for DirectNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for DirectNavigator {
    fn set_destination(&mut self, agent_id: u32, destination: Vec3) {
        self.destinations.insert(agent_id, destination);
    }

    fn clear_destination(&mut self, agent_id: u32) {
        self.destinations.remove(&agent_id);
    }

    fn steer(&mut self, positions: &HashMap<u32, Vec3>, dt: f32) -> Vec<(u32, Vec3)> {
        let mut moved = Vec::new();
        for (&agent_id, dest) in &self.destinations {
            let Some(pos) = positions.get(&agent_id) else {
                continue;
            };
            let speed = self.speeds.get(&agent_id).copied().unwrap_or(1.0);

            let dx = dest.x - pos.x;
            let dz = dest.z - pos.z;
            let distance = (dx * dx + dz * dz).sqrt();
            if distance < 1e-4 {
                continue;
            }

            let step = (speed * dt).min(distance);
            moved.push((
                agent_id,
                Vec3::new(pos.x + dx / distance * step, pos.y, pos.z + dz / distance * step),
            ));
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steers_toward_destination_without_overshoot() {
        let mut nav = DirectNavigator::new();
        nav.register_agent(1, 2.0);
        nav.set_destination(1, Vec3::new(10.0, 0.0, 0.0));

        let mut positions = HashMap::new();
        positions.insert(1, Vec3::default());

        let moved = nav.steer(&positions, 0.5);
        assert_eq!(moved.len(), 1);
        assert!((moved[0].1.x - 1.0).abs() < 1e-5);

        // Close to the goal the step clamps to the remaining distance.
        positions.insert(1, Vec3::new(9.9, 0.0, 0.0));
        let moved = nav.steer(&positions, 1.0);
        assert!((moved[0].1.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn cleared_destination_stops_motion() {
        let mut nav = DirectNavigator::new();
        nav.register_agent(1, 2.0);
        nav.set_destination(1, Vec3::new(5.0, 0.0, 5.0));
        nav.clear_destination(1);

        let mut positions = HashMap::new();
        positions.insert(1, Vec3::default());
        assert!(nav.steer(&positions, 1.0).is_empty());
    }
}
