//! Test to trigger ts-rs bindings export
//! Run with: cargo test export_bindings

#[cfg(test)]
mod tests {
    use crate::shared::types::*;
    use ts_rs::TS;

    #[test]
    fn export_bindings() {
        FieldRole::export().expect("Failed to export FieldRole");
        FieldSnapshot::export().expect("Failed to export FieldSnapshot");
        EngineCommand::export().expect("Failed to export EngineCommand");
        UnitDTO::export().expect("Failed to export UnitDTO");
        CalculatorInfo::export().expect("Failed to export CalculatorInfo");
    }

    #[test]
    fn test_command_wire_shape() {
        let command: EngineCommand = serde_json::from_str(
            r#"{"type":"edit","payload":{"fieldId":"width","rawText":"4"}}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            EngineCommand::Edit { field_id: "width".to_string(), raw_text: "4".to_string() }
        );

        let reset: EngineCommand = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(reset, EngineCommand::Reset);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = FieldSnapshot {
            id: "area".to_string(),
            display_value: "0.004132".to_string(),
            unit: Some("ac".to_string()),
            role: FieldRole::Derived,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["displayValue"], "0.004132");
        assert_eq!(json["role"], "derived");
    }
}
