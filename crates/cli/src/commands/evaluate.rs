use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use clientpulse_core::{
    assemble, ClientActivity, ClientMetrics, ClvEvaluation, ClvRuntime, DeterministicClvRuntime,
    RawClientMetrics,
};

use crate::commands::{load_config, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationOutput {
    metrics: ClientMetrics,
    #[serde(flatten)]
    evaluation: ClvEvaluation,
}

pub fn run(input: Option<&Path>, activity: bool) -> CommandResult {
    let document = match read_input(input) {
        Ok(document) => document,
        Err(error) => {
            return CommandResult::failure("evaluate", "input_read", format!("{error:#}"), 2);
        }
    };

    if !activity {
        return evaluate_document(&document);
    }
    match load_config("evaluate") {
        Ok(config) => {
            evaluate_activity_document(&document, Utc::now(), config.clv.missing_follow_up_days)
        }
        Err(failure) => failure,
    }
}

/// Accepts one metrics object or an array of them and mirrors that shape in
/// the `data` field of the result.
pub fn evaluate_document(document: &str) -> CommandResult {
    let runtime = DeterministicClvRuntime::default();
    evaluate_each(document, |value| {
        let raw: RawClientMetrics = read_object(value, "client metrics")?;
        if raw.company_id.is_blank() {
            return Err("companyId is required".to_string());
        }
        evaluate_raw(&runtime, &raw)
    })
}

/// Same as [`evaluate_document`], but each item is a company's deal, ticket
/// and review records, assembled into metrics as of `now`.
pub fn evaluate_activity_document(
    document: &str,
    now: DateTime<Utc>,
    missing_follow_up_days: i64,
) -> CommandResult {
    let runtime = DeterministicClvRuntime::default();
    evaluate_each(document, |value| {
        let activity: ClientActivity = read_object(value, "client activity")?;
        let raw = assemble(&activity, now, missing_follow_up_days)
            .map_err(|error| error.to_string())?;
        evaluate_raw(&runtime, &raw)
    })
}

fn evaluate_each<F>(document: &str, mut evaluate: F) -> CommandResult
where
    F: FnMut(Value) -> Result<Value, String>,
{
    let parsed: Value = match serde_json::from_str(document) {
        Ok(value) => value,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "invalid_input",
                format!("input is not valid JSON: {error}"),
                2,
            );
        }
    };

    let data = match parsed {
        Value::Array(items) => {
            let mut outputs = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match evaluate(item) {
                    Ok(output) => outputs.push(output),
                    Err(message) => {
                        return CommandResult::failure(
                            "evaluate",
                            "invalid_input",
                            format!("item {index}: {message}"),
                            2,
                        );
                    }
                }
            }
            Value::Array(outputs)
        }
        other => match evaluate(other) {
            Ok(output) => output,
            Err(message) => return CommandResult::failure("evaluate", "invalid_input", message, 2),
        },
    };

    let count = data.as_array().map_or(1, Vec::len);
    CommandResult::success_with_data("evaluate", format!("evaluated {count} client(s)"), Some(data))
}

fn read_object<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, String> {
    if !value.is_object() {
        return Err(format!("expected a JSON object of {what}"));
    }
    serde_json::from_value(value).map_err(|error| format!("unreadable {what}: {error}"))
}

fn evaluate_raw(runtime: &impl ClvRuntime, raw: &RawClientMetrics) -> Result<Value, String> {
    let (metrics, evaluation) = runtime.evaluate_raw(raw);
    serde_json::to_value(EvaluationOutput { metrics, evaluation })
        .map_err(|error| format!("could not serialize evaluation: {error}"))
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("could not read input file `{}`", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("could not read stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use super::{evaluate_activity_document, evaluate_document};

    fn payload(output: &str) -> Value {
        serde_json::from_str(output).expect("command output should be JSON")
    }

    #[test]
    fn evaluates_single_object() {
        let result = evaluate_document(
            r#"{"companyId":"acme","totalRevenue":600000,"supportTicketCount":1,
                "clientHealthScore":90,"daysSinceFollowUp":10,"progress":"Excellent","delivered":true}"#,
        );
        assert_eq!(result.exit_code, 0);

        let payload = payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["classification"]["classification"], "Upsell");
        assert_eq!(payload["data"]["classification"]["valueCategory"], "High Value");
        assert_eq!(payload["data"]["pricing"]["confidenceScore"], 90);
        assert_eq!(payload["data"]["metrics"]["companyId"], "acme");
    }

    #[test]
    fn evaluates_arrays_in_order() {
        let result = evaluate_document(
            r#"[{"companyId":"a","daysSinceFollowUp":120},
                {"companyId":"b","clientHealthScore":"40","supportTicketCount":"7"}]"#,
        );
        assert_eq!(result.exit_code, 0);

        let payload = payload(&result.output);
        let items = payload["data"].as_array().expect("array data");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["classification"]["classification"], "Dormant");
        assert_eq!(items[1]["classification"]["classification"], "At Risk");
        assert_eq!(payload["message"], "evaluated 2 client(s)");
    }

    #[test]
    fn rejects_blank_company_and_malformed_input() {
        let blank = evaluate_document(r#"{"companyId":"  ","totalRevenue":10}"#);
        assert_eq!(blank.exit_code, 2);
        assert_eq!(payload(&blank.output)["error_class"], "invalid_input");

        let malformed = evaluate_document("{not json");
        assert_eq!(malformed.exit_code, 2);

        let scalar = evaluate_document("[42]");
        assert_eq!(scalar.exit_code, 2);
        assert!(payload(&scalar.output)["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("item 0"));
    }

    #[test]
    fn assembles_activity_records_before_evaluating() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).single().expect("valid timestamp");
        let result = evaluate_activity_document(
            r#"{"companyId":"acme",
                "deals":[{"companyId":"acme","amount":"400000"},
                         {"companyId":"acme","amount":"200000"}],
                "supportTickets":[{"companyId":"acme"}],
                "review":{"companyId":"acme","progress":"Excellent","healthScore":"90",
                          "delivered":true,"lastFollowUpAt":"2026-05-22T00:00:00Z"}}"#,
            now,
            365,
        );
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = payload(&result.output);
        assert_eq!(payload["data"]["metrics"]["totalRevenue"], "600000");
        assert_eq!(payload["data"]["metrics"]["daysSinceFollowUp"], 10);
        assert_eq!(payload["data"]["classification"]["classification"], "Upsell");
    }

    #[test]
    fn missing_follow_up_uses_configured_days() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).single().expect("valid timestamp");
        let document = r#"[{"companyId":"acme","deals":[{"companyId":"acme","amount":"5000"}]}]"#;

        let lenient = payload(&evaluate_activity_document(document, now, 30).output);
        assert_eq!(lenient["data"][0]["metrics"]["daysSinceFollowUp"], 30);
        assert_ne!(lenient["data"][0]["classification"]["classification"], "Dormant");

        let strict = payload(&evaluate_activity_document(document, now, 365).output);
        assert_eq!(strict["data"][0]["classification"]["classification"], "Dormant");
    }

    #[test]
    fn activity_without_deals_is_rejected() {
        let result = evaluate_activity_document(
            r#"{"companyId":"acme","deals":[{"companyId":"globex","amount":"10"}]}"#,
            Utc::now(),
            365,
        );
        assert_eq!(result.exit_code, 2);

        let payload = payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("no deal records"));
    }
}
