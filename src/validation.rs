use serde_json::{Map, Value as JsonValue};

use crate::schema::{self, FieldSpec, CHILLER_COUNT_FIELD, SITE_META_FIELDS, TECHNICAL_FIELDS};
use crate::types::{CandidateRecord, Rejection, ValidationOutcome};

/// Checks a candidate against the required schema. Never fails: anything
/// absent or malformed ends up in the rejection.
pub fn validate(record: &CandidateRecord) -> ValidationOutcome {
    let expected_chillers = chiller_count(&record.site_meta_data);

    let rejection = Rejection {
        missing_site_meta_data_keys: missing_keys(&SITE_META_FIELDS, &record.site_meta_data),
        missing_technical_data_keys: missing_keys(&TECHNICAL_FIELDS, &record.technical_data),
        incomplete_chiller_data_keys: schema::per_chiller_fields()
            .filter(|spec| {
                !sequence_matches(record.technical_data.get(spec.name), expected_chillers)
            })
            .map(|spec| spec.name.to_string())
            .collect(),
        expected_chillers,
    };

    if rejection.is_empty() {
        ValidationOutcome::Accepted(record.clone())
    } else {
        ValidationOutcome::Rejected(rejection)
    }
}

fn missing_keys(fields: &[FieldSpec], section: &Map<String, JsonValue>) -> Vec<String> {
    fields
        .iter()
        .filter(|spec| !is_present(section.get(spec.name)))
        .map(|spec| spec.name.to_string())
        .collect()
}

// null means the model could not find the value
fn is_present(value: Option<&JsonValue>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}

fn chiller_count(site_meta: &Map<String, JsonValue>) -> Option<u64> {
    match site_meta.get(CHILLER_COUNT_FIELD)? {
        JsonValue::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

fn sequence_matches(value: Option<&JsonValue>, expected: Option<u64>) -> bool {
    match (value, expected) {
        (Some(JsonValue::Array(items)), Some(n)) => items.len() as u64 == n,
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    pub(crate) fn valid_record(chillers: usize) -> CandidateRecord {
        let per_chiller = json!(vec![45.0; chillers]);
        serde_json::from_value(json!({
            "site_meta_data": {
                "how_many_chiller": chillers,
                "how_many_pchp": 4,
                "how_many_vsd_pchp": 2,
                "how_many_schp": 3,
                "how_many_vsd_schp": 3,
                "how_many_cdp": 4,
                "how_many_vsd_cdp": 0,
                "how_many_cooling_tower": 3,
                "operation_hour": "24/7"
            },
            "technical_data": {
                "average_ton": 850.5,
                "average_kw": 620.0,
                "average_kw_per_ton": 0.73,
                "each_chiller_chs_temp": per_chiller,
                "each_chiller_chr_temp": per_chiller,
                "each_chiller_chwdelta_temp": per_chiller,
                "each_chiller_cds_temp": per_chiller,
                "each_chiller_cdr_temp": per_chiller,
                "each_chiller_cdwdelta_temp": per_chiller,
                "each_chiller_setpoint": per_chiller
            }
        }))
        .unwrap()
    }

    fn rejection(outcome: ValidationOutcome) -> Rejection {
        match outcome {
            ValidationOutcome::Rejected(r) => r,
            ValidationOutcome::Accepted(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn complete_record_is_accepted_unchanged() {
        let record = valid_record(3);
        assert_eq!(validate(&record), ValidationOutcome::Accepted(record.clone()));
    }

    #[test]
    fn optional_wetbulb_and_extra_keys_do_not_matter() {
        let mut record = valid_record(2);
        record
            .technical_data
            .insert("site_wetbulb_temperature".into(), json!(27.5));
        record.site_meta_data.insert("site_name".into(), json!("Tower A"));
        assert!(validate(&record).is_accepted());
    }

    #[test]
    fn short_sequence_is_incomplete() {
        let mut record = valid_record(3);
        record
            .technical_data
            .insert("each_chiller_chs_temp".into(), json!([45, 45]));
        let r = rejection(validate(&record));
        assert_eq!(r.incomplete_chiller_data_keys, vec!["each_chiller_chs_temp"]);
        assert!(r.missing_site_meta_data_keys.is_empty());
        assert!(r.missing_technical_data_keys.is_empty());
        let msg = r.message();
        assert!(msg.contains("Incomplete chiller data"));
        assert!(msg.contains("each_chiller_chs_temp"));
    }

    #[test]
    fn missing_site_keys_reported_in_schema_order() {
        let mut record = valid_record(3);
        record.site_meta_data.remove("operation_hour");
        record.site_meta_data.remove("how_many_vsd_schp");
        record.site_meta_data.remove("how_many_pchp");
        let r = rejection(validate(&record));
        assert_eq!(
            r.missing_site_meta_data_keys,
            vec!["how_many_pchp", "how_many_vsd_schp", "operation_hour"]
        );
        assert!(r.message().contains(
            "Missing site_meta_data keys: how_many_pchp, how_many_vsd_schp, operation_hour"
        ));
    }

    #[test]
    fn missing_technical_keys_reported_in_schema_order() {
        let mut record = valid_record(1);
        record.technical_data.remove("average_kw_per_ton");
        record.technical_data.remove("average_ton");
        let r = rejection(validate(&record));
        assert_eq!(r.missing_technical_data_keys, vec!["average_ton", "average_kw_per_ton"]);
        assert!(r.incomplete_chiller_data_keys.is_empty());
    }

    #[test]
    fn absent_sequence_is_both_missing_and_incomplete() {
        let mut record = valid_record(3);
        record.technical_data.remove("each_chiller_setpoint");
        let r = rejection(validate(&record));
        assert_eq!(r.missing_technical_data_keys, vec!["each_chiller_setpoint"]);
        assert_eq!(r.incomplete_chiller_data_keys, vec!["each_chiller_setpoint"]);
    }

    #[test]
    fn unknown_chiller_count_fails_every_sequence() {
        let mut record = valid_record(3);
        record.site_meta_data.remove("how_many_chiller");
        let r = rejection(validate(&record));
        assert_eq!(r.missing_site_meta_data_keys, vec!["how_many_chiller"]);
        assert_eq!(r.incomplete_chiller_data_keys.len(), 7);
        assert_eq!(r.expected_chillers, None);
        assert!(r.message().contains("how_many_chiller is missing"));
    }

    #[test]
    fn non_numeric_chiller_count_fails_every_sequence() {
        let mut record = valid_record(3);
        record
            .site_meta_data
            .insert("how_many_chiller".into(), json!("three"));
        let r = rejection(validate(&record));
        assert!(r.missing_site_meta_data_keys.is_empty());
        assert_eq!(r.incomplete_chiller_data_keys.len(), 7);
    }

    #[test]
    fn integral_float_chiller_count_is_accepted() {
        let mut record = valid_record(3);
        record
            .site_meta_data
            .insert("how_many_chiller".into(), json!(3.0));
        assert!(validate(&record).is_accepted());
    }

    #[test]
    fn null_values_count_as_missing() {
        let mut record = valid_record(2);
        record
            .site_meta_data
            .insert("how_many_cooling_tower".into(), JsonValue::Null);
        let r = rejection(validate(&record));
        assert_eq!(r.missing_site_meta_data_keys, vec!["how_many_cooling_tower"]);
    }

    #[test]
    fn scalar_in_place_of_sequence_is_incomplete() {
        let mut record = valid_record(1);
        record
            .technical_data
            .insert("each_chiller_cdr_temp".into(), json!(31.0));
        let r = rejection(validate(&record));
        assert_eq!(r.incomplete_chiller_data_keys, vec!["each_chiller_cdr_temp"]);
    }

    #[test]
    fn every_defect_category_is_reported_together() {
        let record: CandidateRecord = serde_json::from_value(json!({
            "site_meta_data": { "how_many_chiller": 2 },
            "technical_data": { "each_chiller_chs_temp": [44.0] }
        }))
        .unwrap();
        let r = rejection(validate(&record));
        assert_eq!(r.missing_site_meta_data_keys.len(), 8);
        assert_eq!(r.missing_technical_data_keys.len(), 9);
        assert_eq!(r.incomplete_chiller_data_keys.len(), 7);
        let msg = r.message();
        assert!(msg.contains("Missing site_meta_data keys"));
        assert!(msg.contains("Missing technical_data keys"));
        assert!(msg.contains("Incomplete chiller data"));
    }

    #[test]
    fn empty_record_is_rejected_not_panicking() {
        let r = rejection(validate(&CandidateRecord::default()));
        assert_eq!(r.missing_site_meta_data_keys.len(), 9);
        assert_eq!(r.missing_technical_data_keys.len(), 10);
    }
}
