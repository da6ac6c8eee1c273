use glam::Vec3;
use log::debug;

use super::data::{Area, FreescapeData, Object, VAR_SHIELD};
use super::geometry::Aabb;
use super::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorHit {
    pub object: u16,
    pub damage: i32,
    pub ghost: bool,
}

/// True when `eye` lies within the sensor's reach and on one of its axes.
/// An axis counts as aligned when the eye is inside the sensor's extent on
/// the two other axes, widened by `tolerance`.
pub fn sees_player(object: &Object, eye: Vec3, tolerance: f32) -> bool {
    let Some(sensor) = &object.sensor else {
        return false;
    };
    let bounds = Aabb::new(object.min(), object.max());
    if bounds.center().distance(eye) > sensor.firing_range {
        return false;
    }
    if sensor.axes.is_empty() {
        return true;
    }
    sensor.axes.iter().any(|axis| {
        let along = axis.index();
        (0..3).filter(|i| *i != along).all(|i| {
            eye[i] >= bounds.min[i] - tolerance && eye[i] <= bounds.max[i] + tolerance
        })
    })
}

/// Advances every live sensor of `area` by one game tick and applies the
/// shots that fire.
pub fn update_sensors(
    data: &FreescapeData,
    area: &Area,
    state: &mut GameState,
    eye: Vec3,
) -> Vec<SensorHit> {
    let mut hits = Vec::new();
    for object in &area.objects {
        let Some(sensor) = &object.sensor else {
            continue;
        };
        if !state.is_present(area.id, object.id) {
            continue;
        }
        let timer = state.sensor_timers.entry(object.id).or_insert(0);
        *timer += 1;
        if *timer < sensor.firing_interval.max(1) {
            continue;
        }
        if !sees_player(object, eye, area.scale) {
            continue;
        }
        *timer = 0;
        let hit = SensorHit {
            object: object.id,
            damage: sensor.damage,
            ghost: object.ghost,
        };
        apply_hit(data, state, hit);
        hits.push(hit);
    }
    hits
}

fn apply_hit(data: &FreescapeData, state: &mut GameState, hit: SensorHit) {
    if hit.ghost {
        if let Some(castle) = state.castle_mut() {
            castle.spirits_meter = (castle.spirits_meter + hit.damage).min(castle.spirits_max);
            debug!(
                "spirit {} strikes, meter {}/{}",
                hit.object, castle.spirits_meter, castle.spirits_max
            );
            return;
        }
    }
    state.add_var(data, VAR_SHIELD, -hit.damage);
    debug!(
        "sensor {} fires for {}, shield {}",
        hit.object,
        hit.damage,
        state.var(VAR_SHIELD)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(variant: &str, ghost: bool) -> FreescapeData {
        let raw = format!(
            r#"{{
                "title": "sensors", "variant": "{variant}", "start_area": 1,
                "max_shield": 20, "max_energy": 20,
                "castle": {{"spirits_max": 6, "strength": 5}},
                "areas": [{{"id": 1, "name": "Court", "scale": 2, "objects": [
                    {{"id": 9, "kind": "sensor", "origin": [10, 0, 10], "size": [2, 2, 2],
                      "ghost": {ghost},
                      "sensor": {{"firing_range": 30, "firing_interval": 3, "damage": 4, "axes": ["z"]}}}}
                ]}}]
            }}"#
        );
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn sensors_need_alignment_and_range() {
        let data = data("dark", false);
        let sensor = &data.areas[0].objects[0];
        assert!(sees_player(sensor, Vec3::new(11.0, 1.0, 30.0), 2.0));
        assert!(!sees_player(sensor, Vec3::new(30.0, 1.0, 30.0), 2.0), "off axis");
        assert!(!sees_player(sensor, Vec3::new(11.0, 1.0, 60.0), 2.0), "out of range");
    }

    #[test]
    fn sensors_fire_on_interval() {
        let data = data("dark", false);
        let mut state = GameState::new(&data);
        let eye = Vec3::new(11.0, 1.0, 20.0);
        let area = &data.areas[0];
        let fired: usize = (0..9)
            .map(|_| update_sensors(&data, area, &mut state, eye).len())
            .sum();
        assert_eq!(fired, 3);
        assert_eq!(state.var(VAR_SHIELD), 8);

        state.destroy(&data, 1, 9);
        assert!(update_sensors(&data, area, &mut state, eye).is_empty());
    }

    #[test]
    fn castle_ghosts_feed_the_spirit_meter() {
        let data = data("castle", true);
        let mut state = GameState::new(&data);
        let eye = Vec3::new(11.0, 1.0, 20.0);
        for _ in 0..6 {
            update_sensors(&data, &data.areas[0], &mut state, eye);
        }
        let castle = state.castle().unwrap();
        assert_eq!(castle.spirits_meter, 6);
        assert_eq!(state.var(VAR_SHIELD), 20);
    }
}
