//! Tool-call request/response plumbing shared by the Pink Mobile handlers.
//!
//! The upstream tool-calling model drifts between key spellings
//! (`customerId`, `customer_id`, bare top-level fields), so extraction
//! is a single ordered-fallback helper instead of per-handler chains.

use serde::Serialize;
use serde_json::{json, Value};

/// A parsed tool invocation: the tool-call id to echo back, the
/// argument bag, and the raw body for top-level fallbacks.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_call_id: String,
    args: Value,
    body: Value,
}

impl ToolInvocation {
    pub fn from_body(body: Value) -> Self {
        let tool_call = body
            .pointer("/message/toolCalls/0")
            .or_else(|| body.pointer("/message/tool_calls/0"))
            .cloned()
            .unwrap_or(Value::Null);

        let tool_call_id = tool_call
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let mut args = tool_call
            .pointer("/function/arguments")
            .cloned()
            .unwrap_or(Value::Null);
        // Some tool-call payloads carry arguments as a JSON-encoded string.
        if let Value::String(raw) = &args {
            args = serde_json::from_str(raw).unwrap_or(Value::Null);
        }
        if args.is_null() {
            args = body.get("arguments").cloned().unwrap_or(Value::Null);
        }

        Self {
            tool_call_id,
            args,
            body,
        }
    }

    /// First non-empty string under any of the given keys, checking the
    /// argument bag before the request body.
    pub fn str_arg(&self, keys: &[&str]) -> Option<String> {
        for source in [&self.args, &self.body] {
            for key in keys {
                if let Some(v) = source.get(*key) {
                    match v {
                        Value::String(s) if !s.is_empty() => return Some(s.clone()),
                        Value::Number(n) => return Some(n.to_string()),
                        _ => {}
                    }
                }
            }
        }
        None
    }

    pub fn bool_arg(&self, keys: &[&str]) -> Option<bool> {
        for source in [&self.args, &self.body] {
            for key in keys {
                if let Some(b) = source.get(*key).and_then(Value::as_bool) {
                    return Some(b);
                }
            }
        }
        None
    }

    pub fn i64_arg(&self, keys: &[&str]) -> Option<i64> {
        for source in [&self.args, &self.body] {
            for key in keys {
                match source.get(*key) {
                    Some(Value::Number(n)) => return n.as_i64(),
                    Some(Value::String(s)) => {
                        if let Ok(parsed) = s.parse() {
                            return Some(parsed);
                        }
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Raw value lookup for array/object arguments.
    pub fn value_arg(&self, keys: &[&str]) -> Option<Value> {
        for source in [&self.args, &self.body] {
            for key in keys {
                if let Some(v) = source.get(*key) {
                    if !v.is_null() {
                        return Some(v.clone());
                    }
                }
            }
        }
        None
    }

    /// Caller number captured by the platform, outside the argument bag.
    pub fn platform_caller_number(&self) -> Option<String> {
        self.body
            .pointer("/message/call/customer/number")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn platform_call_id(&self) -> Option<String> {
        self.body
            .pointer("/message/call/id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Response envelope VAPI expects from a function tool.
#[derive(Debug, Serialize)]
pub struct ToolResults {
    pub results: Vec<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<TransferDestination>,
}

#[derive(Debug, Serialize)]
pub struct ToolResult {
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    /// JSON-encoded result string, per the platform contract.
    pub result: String,
}

/// Call-forwarding target attached to transfer replies.
#[derive(Debug, Serialize)]
pub struct TransferDestination {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub number: String,
    pub message: String,
    pub description: String,
}

impl ToolResults {
    pub fn reply(tool_call_id: &str, result: &Value) -> Self {
        Self {
            results: vec![ToolResult {
                tool_call_id: tool_call_id.to_string(),
                result: result.to_string(),
            }],
            destination: None,
        }
    }

    pub fn plain_reply(tool_call_id: &str, result: impl Into<String>) -> Self {
        Self {
            results: vec![ToolResult {
                tool_call_id: tool_call_id.to_string(),
                result: result.into(),
            }],
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: TransferDestination) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Scripted apology used when a tool handler fails outright.
    pub fn apology(tool_call_id: &str, message: &str) -> Self {
        Self::reply(
            tool_call_id,
            &json!({ "success": false, "message": message }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vapi_body(args: Value) -> Value {
        json!({
            "message": {
                "toolCalls": [{
                    "id": "call_123",
                    "function": { "name": "lookup", "arguments": args }
                }],
                "call": { "id": "vapi-1", "customer": { "number": "+15550001111" } }
            }
        })
    }

    #[test]
    fn extracts_tool_call_id_and_args() {
        let inv = ToolInvocation::from_body(vapi_body(json!({ "customerId": "abc" })));
        assert_eq!(inv.tool_call_id, "call_123");
        assert_eq!(inv.str_arg(&["customerId", "customer_id"]).as_deref(), Some("abc"));
    }

    #[test]
    fn snake_case_fallback() {
        let inv = ToolInvocation::from_body(vapi_body(json!({ "customer_id": "abc" })));
        assert_eq!(inv.str_arg(&["customerId", "customer_id"]).as_deref(), Some("abc"));
    }

    #[test]
    fn top_level_body_fallback() {
        let inv = ToolInvocation::from_body(json!({ "customerId": "xyz" }));
        assert_eq!(inv.tool_call_id, "unknown");
        assert_eq!(inv.str_arg(&["customerId"]).as_deref(), Some("xyz"));
    }

    #[test]
    fn snake_case_tool_calls_key() {
        let body = json!({
            "message": {
                "tool_calls": [{
                    "id": "call_9",
                    "function": { "arguments": { "pin": "1234" } }
                }]
            }
        });
        let inv = ToolInvocation::from_body(body);
        assert_eq!(inv.tool_call_id, "call_9");
        assert_eq!(inv.str_arg(&["pin"]).as_deref(), Some("1234"));
    }

    #[test]
    fn string_encoded_arguments() {
        let body = json!({
            "message": {
                "toolCalls": [{
                    "id": "call_s",
                    "function": { "arguments": "{\"quantity\": 2}" }
                }]
            }
        });
        let inv = ToolInvocation::from_body(body);
        assert_eq!(inv.i64_arg(&["quantity"]), Some(2));
    }

    #[test]
    fn numeric_args_coerce_to_strings() {
        let inv = ToolInvocation::from_body(vapi_body(json!({ "totalLines": 5 })));
        assert_eq!(inv.str_arg(&["totalLines"]).as_deref(), Some("5"));
        assert_eq!(inv.i64_arg(&["totalLines"]), Some(5));
    }

    #[test]
    fn platform_fields() {
        let inv = ToolInvocation::from_body(vapi_body(json!({})));
        assert_eq!(inv.platform_caller_number().as_deref(), Some("+15550001111"));
        assert_eq!(inv.platform_call_id().as_deref(), Some("vapi-1"));
    }

    #[test]
    fn result_is_json_encoded_string() {
        let reply = ToolResults::reply("call_1", &json!({ "success": true }));
        let encoded = serde_json::to_value(&reply).unwrap();
        assert_eq!(encoded["results"][0]["toolCallId"], "call_1");
        let inner: Value =
            serde_json::from_str(encoded["results"][0]["result"].as_str().unwrap()).unwrap();
        assert_eq!(inner["success"], true);
        assert!(encoded.get("destination").is_none());
    }

    #[test]
    fn destination_serializes_when_present() {
        let reply = ToolResults::plain_reply("call_1", "Transferring")
            .with_destination(TransferDestination {
                kind: "number",
                number: "+17655550100".to_string(),
                message: "Please hold.".to_string(),
                description: "Escalation".to_string(),
            });
        let encoded = serde_json::to_value(&reply).unwrap();
        assert_eq!(encoded["destination"]["type"], "number");
        assert_eq!(encoded["destination"]["number"], "+17655550100");
    }
}
