//! Mock process plant served by the sensor API.
//!
//! One tank fed by `valve1` and drained by `valve2`, a pump, and a system
//! status block. Each read advances the plant by one small random step.

use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::datetime::now_rfc3339;
use crate::error::TwinError;

pub const COMPONENTS: [&str; 5] = ["tank1", "pump1", "valve1", "valve2", "system"];

/// Integral values are written without a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::trivially_copy_pass_by_ref)]
fn compact<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TankState {
    #[serde(serialize_with = "compact")]
    pub temperature: f64,
    #[serde(serialize_with = "compact")]
    pub pressure: f64,
    #[serde(serialize_with = "compact")]
    pub level: f64,
    pub status: SmolStr,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpState {
    #[serde(serialize_with = "compact")]
    pub rpm: f64,
    #[serde(serialize_with = "compact")]
    pub power: f64,
    #[serde(serialize_with = "compact")]
    pub flow: f64,
    pub status: SmolStr,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValveState {
    pub position: SmolStr,
    #[serde(serialize_with = "compact")]
    pub flow: f64,
    pub status: SmolStr,
    pub last_updated: String,
}

impl ValveState {
    fn closed(stamp: &str) -> Self {
        Self {
            position: "closed".into(),
            flow: 0.0,
            status: "ok".into(),
            last_updated: stamp.to_string(),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.position == "open"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub status: SmolStr,
    pub alarms: Vec<Value>,
    pub notifications: Vec<Value>,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorPlant {
    pub tank1: TankState,
    pub pump1: PumpState,
    pub valve1: ValveState,
    pub valve2: ValveState,
    pub system: SystemState,
}

impl Default for SensorPlant {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPlant {
    #[must_use]
    pub fn new() -> Self {
        let stamp = now_rfc3339();
        Self {
            tank1: TankState {
                temperature: 25.0,
                pressure: 1013.0,
                level: 50.0,
                status: "standby".into(),
                last_updated: stamp.clone(),
            },
            pump1: PumpState {
                rpm: 0.0,
                power: 0.0,
                flow: 0.0,
                status: "off".into(),
                last_updated: stamp.clone(),
            },
            valve1: ValveState::closed(&stamp),
            valve2: ValveState::closed(&stamp),
            system: SystemState {
                status: "normal".into(),
                alarms: Vec::new(),
                notifications: Vec::new(),
                last_updated: stamp,
            },
        }
    }

    /// Advance the plant one step.
    pub fn advance(&mut self, rng: &mut impl Rng) {
        let tank = &mut self.tank1;
        tank.temperature = round_to(tank.temperature + (rng.gen::<f64>() - 0.5) * 0.2, 1);
        tank.pressure = round_to(tank.pressure + (rng.gen::<f64>() - 0.5) * 2.0, 0);

        match (self.valve1.is_open(), self.valve2.is_open()) {
            (true, false) => tank.level += 0.1,
            (false, true) => tank.level -= 0.1,
            _ => {}
        }
        tank.level = round_to(tank.level.clamp(0.0, 100.0), 1);

        if self.pump1.status == "on" {
            let mut flow = self.pump1.power;
            match (self.valve1.is_open(), self.valve2.is_open()) {
                (false, false) => flow = 0.0,
                (true, true) => {}
                _ => flow *= 0.5,
            }
            self.pump1.flow = round_to(flow, 1);
            self.valve1.flow = if self.valve1.is_open() { self.pump1.flow } else { 0.0 };
            self.valve2.flow = if self.valve2.is_open() { self.pump1.flow } else { 0.0 };
        } else {
            self.pump1.flow = 0.0;
            self.valve1.flow = 0.0;
            self.valve2.flow = 0.0;
        }

        let stamp = now_rfc3339();
        self.tank1.last_updated.clone_from(&stamp);
        self.pump1.last_updated.clone_from(&stamp);
        self.valve1.last_updated.clone_from(&stamp);
        self.valve2.last_updated.clone_from(&stamp);
        self.system.last_updated = stamp;
    }

    #[must_use]
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn component(&self, name: &str) -> Result<Value, TwinError> {
        let value = match name {
            "tank1" => serde_json::to_value(&self.tank1),
            "pump1" => serde_json::to_value(&self.pump1),
            "valve1" => serde_json::to_value(&self.valve1),
            "valve2" => serde_json::to_value(&self.valve2),
            "system" => serde_json::to_value(&self.system),
            _ => return Err(TwinError::UnknownComponent(name.into())),
        };
        Ok(value.unwrap_or(Value::Null))
    }

    /// Apply a control update. Only fields the component already has are
    /// changed, `lastUpdated` is never taken from the caller, and switching
    /// the pump off zeroes its rpm and flow. Returns the updated component.
    pub fn apply_control(&mut self, name: &str, updates: &Map<String, Value>) -> Result<Value, TwinError> {
        let Value::Object(mut fields) = self.component(name)? else {
            return Err(TwinError::UnknownComponent(name.into()));
        };
        for (key, value) in updates {
            if key != "lastUpdated" && fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
        fields.insert("lastUpdated".into(), Value::String(now_rfc3339()));
        let merged = Value::Object(fields);
        let invalid = |err: serde_json::Error| TwinError::InvalidControl {
            component: name.into(),
            message: err.to_string().into(),
        };
        match name {
            "tank1" => self.tank1 = serde_json::from_value(merged).map_err(invalid)?,
            "pump1" => {
                self.pump1 = serde_json::from_value(merged).map_err(invalid)?;
                if updates.get("status").and_then(Value::as_str) == Some("off") {
                    self.pump1.rpm = 0.0;
                    self.pump1.flow = 0.0;
                }
            }
            "valve1" => self.valve1 = serde_json::from_value(merged).map_err(invalid)?,
            "valve2" => self.valve2 = serde_json::from_value(merged).map_err(invalid)?,
            "system" => self.system = serde_json::from_value(merged).map_err(invalid)?,
            _ => return Err(TwinError::UnknownComponent(name.into())),
        }
        self.component(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn updates(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("object literal"),
        }
    }

    #[test]
    fn level_rises_with_inlet_open() {
        let mut plant = SensorPlant::new();
        let mut rng = StdRng::seed_from_u64(1);
        plant
            .apply_control("valve1", &updates(json!({ "position": "open" })))
            .expect("valve1");
        plant.advance(&mut rng);
        assert_eq!(plant.tank1.level, 50.1);
        plant
            .apply_control("valve2", &updates(json!({ "position": "open" })))
            .expect("valve2");
        plant.advance(&mut rng);
        assert_eq!(plant.tank1.level, 50.1);
    }

    #[test]
    fn pump_flow_depends_on_valves() {
        let mut plant = SensorPlant::new();
        let mut rng = StdRng::seed_from_u64(2);
        plant
            .apply_control("pump1", &updates(json!({ "status": "on", "power": 80 })))
            .expect("pump1");
        plant.advance(&mut rng);
        assert_eq!(plant.pump1.flow, 0.0);

        plant
            .apply_control("valve1", &updates(json!({ "position": "open" })))
            .expect("valve1");
        plant.advance(&mut rng);
        assert_eq!(plant.pump1.flow, 40.0);
        assert_eq!(plant.valve1.flow, 40.0);
        assert_eq!(plant.valve2.flow, 0.0);

        plant
            .apply_control("valve2", &updates(json!({ "position": "open" })))
            .expect("valve2");
        plant.advance(&mut rng);
        assert_eq!(plant.pump1.flow, 80.0);
        assert_eq!(plant.valve2.flow, 80.0);
    }

    #[test]
    fn control_ignores_unknown_fields_and_stamp() {
        let mut plant = SensorPlant::new();
        let result = plant
            .apply_control(
                "tank1",
                &updates(json!({ "status": "warning", "color": "red", "lastUpdated": "never" })),
            )
            .expect("tank1");
        assert_eq!(result["status"], "warning");
        assert!(result.get("color").is_none());
        assert_ne!(result["lastUpdated"], "never");
    }

    #[test]
    fn pump_off_zeroes_rpm_and_flow() {
        let mut plant = SensorPlant::new();
        plant
            .apply_control("pump1", &updates(json!({ "status": "on", "rpm": 1500, "flow": 20 })))
            .expect("on");
        let result = plant
            .apply_control("pump1", &updates(json!({ "status": "off" })))
            .expect("off");
        assert_eq!(result["rpm"], 0);
        assert_eq!(result["flow"], 0);
    }

    #[test]
    fn control_errors() {
        let mut plant = SensorPlant::new();
        assert_eq!(
            plant.apply_control("boiler", &Map::new()),
            Err(TwinError::UnknownComponent("boiler".into()))
        );
        let err = plant
            .apply_control("tank1", &updates(json!({ "level": "high" })))
            .expect_err("ill-typed");
        assert!(matches!(err, TwinError::InvalidControl { .. }));
        assert_eq!(plant.tank1.level, 50.0);
    }

    #[test]
    fn snapshot_uses_compact_numbers() {
        let plant = SensorPlant::new();
        let snapshot = plant.snapshot();
        assert_eq!(snapshot["tank1"]["pressure"].to_string(), "1013");
        assert_eq!(snapshot["valve1"]["position"], "closed");
        assert_eq!(snapshot["system"]["alarms"], json!([]));
    }
}
