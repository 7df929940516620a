use crate::types::LogicalId;
use serde::{Deserialize, Serialize};

/// Late-bound reference resolved by the orchestrator at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    /// `{"Ref": "<id>"}`
    Ref(LogicalId),
    /// `{"Fn::GetAtt": ["<id>", "<attribute>"]}`
    #[serde(rename = "Fn::GetAtt")]
    GetAtt(LogicalId, String),
    /// `{"Fn::Sub": "...${Id.Attr}..."}`
    #[serde(rename = "Fn::Sub")]
    Sub(String),
}

impl Intrinsic {
    pub fn reference(id: impl Into<LogicalId>) -> Self {
        Self::Ref(id.into())
    }

    pub fn get_att(id: impl Into<LogicalId>, attribute: &str) -> Self {
        Self::GetAtt(id.into(), attribute.to_owned())
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    /// Logical ids this reference depends on. Pseudo parameters (`AWS::Region`)
    /// inside `Fn::Sub` are not resources and are skipped.
    pub fn referenced_ids(&self) -> Vec<LogicalId> {
        match self {
            Self::Ref(id) | Self::GetAtt(id, _) => vec![id.clone()],
            Self::Sub(template) => sub_placeholders(template)
                .filter(|name| !name.starts_with("AWS::"))
                .map(|name| {
                    let id = name.split_once('.').map_or(name, |(id, _)| id);
                    LogicalId::new(id)
                })
                .collect(),
        }
    }
}

/// Iterate the `${...}` placeholders of a `Fn::Sub` template. `${!Literal}`
/// escapes are not placeholders.
pub fn sub_placeholders(template: &str) -> impl Iterator<Item = &str> {
    template
        .split("${")
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name.trim()))
        .filter(|name| !name.is_empty() && !name.starts_with('!'))
}
