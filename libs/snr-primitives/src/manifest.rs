use serde::{Deserialize, Serialize};

/// The plugin's static self-description, sent once in reply to the host's
/// `getmanifest` request. Built at startup, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub options: Vec<OptionSpec>,
    pub rpcmethods: Vec<RpcMethodSpec>,
    pub subscriptions: Vec<String>,
    pub hooks: Vec<String>,
    pub features: FeatureSet,
    pub dynamic: bool,
}

/// A declared startup option. The host coerces the supplied value to the
/// declared type before echoing it back in `init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Flag,
    String,
    Int,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMethodSpec {
    pub name: String,
    pub usage: String,
    pub description: String,
}

/// Feature-bitmap echo. This plugin sets no feature bits; the host still
/// expects the keys to be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub node: Option<String>,
    pub channel: Option<String>,
    pub init: Option<String>,
    pub invoice: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manifest_serializes_with_expected_keys() {
        let manifest = Manifest {
            options: vec![OptionSpec {
                name: "snr-dry-run".to_string(),
                option_type: OptionType::Flag,
                default: Some(serde_json::json!("false")),
                description: "Enable dry run.".to_string(),
            }],
            rpcmethods: vec![RpcMethodSpec {
                name: "snr-ticker".to_string(),
                usage: "[fiat-currency]".to_string(),
                description: "Get the ticker.".to_string(),
            }],
            subscriptions: vec!["shutdown".to_string(), "sendpay_success".to_string()],
            hooks: vec![],
            features: FeatureSet::default(),
            dynamic: true,
        };

        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["options"][0]["type"], "flag");
        assert_eq!(value["options"][0]["default"], "false");
        assert_eq!(value["rpcmethods"][0]["usage"], "[fiat-currency]");
        assert_eq!(value["subscriptions"][1], "sendpay_success");
        assert_eq!(value["hooks"], serde_json::json!([]));
        assert_eq!(value["features"]["node"], serde_json::Value::Null);
        assert_eq!(value["dynamic"], true);
    }

    #[test]
    fn option_type_round_trip() {
        for (ty, s) in [
            (OptionType::Flag, "\"flag\""),
            (OptionType::String, "\"string\""),
            (OptionType::Int, "\"int\""),
        ] {
            assert_eq!(serde_json::to_string(&ty).unwrap(), s);
            let parsed: OptionType = serde_json::from_str(s).unwrap();
            assert_eq!(parsed, ty);
        }
    }
}
