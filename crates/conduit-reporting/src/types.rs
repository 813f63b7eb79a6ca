use serde::{Deserialize, Serialize};

/// Labels to apply to variables of one process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableLabels {
  pub definition_key: String,
  pub labels: Vec<VariableLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableLabel {
  pub variable_name: String,
  pub variable_type: String,
  pub variable_label: String,
}

impl VariableLabels {
  /// A request carrying a single label.
  pub fn single(definition_key: impl Into<String>, label: VariableLabel) -> Self {
    Self {
      definition_key: definition_key.into(),
      labels: vec![label],
    }
  }
}
