//! Typed rule params, keyed by [`RuleKey`].

use marathon_core::rule::RuleKey;
use serde::{Deserialize, Serialize};

use crate::{
  rules::{
    AllowedFileTypes, MaxFileSize, NoModification, Rule, SameDevice, StrictTimestampOrdering,
    WithinTimerange,
  },
  Result, RuleError,
};

/// The params of one rule. The variant name serves as the rule key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ruleKey", content = "params", rename_all = "kebab-case")]
pub enum RuleParams {
  AllowedFileTypes(AllowedFileTypes),
  MaxFileSize(MaxFileSize),
  StrictTimestampOrdering(StrictTimestampOrdering),
  SameDevice(SameDevice),
  WithinTimerange(WithinTimerange),
  NoModification(NoModification),
}

impl RuleParams {
  /// Parse and check the params payload for `key`. Unknown fields, missing
  /// fields and semantically invalid values are all rejected.
  pub fn from_parts(key: RuleKey, params: &serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "ruleKey": key, "params": params });
    let parsed: Self =
      serde_json::from_value(wrapped).map_err(|e| RuleError::params(key, e.to_string()))?;
    parsed.validate().map_err(|reason| RuleError::params(key, reason))?;
    Ok(parsed)
  }

  pub fn key(&self) -> RuleKey {
    match self {
      Self::AllowedFileTypes(_) => RuleKey::AllowedFileTypes,
      Self::MaxFileSize(_) => RuleKey::MaxFileSize,
      Self::StrictTimestampOrdering(_) => RuleKey::StrictTimestampOrdering,
      Self::SameDevice(_) => RuleKey::SameDevice,
      Self::WithinTimerange(_) => RuleKey::WithinTimerange,
      Self::NoModification(_) => RuleKey::NoModification,
    }
  }

  /// The params payload without the key tag, as persisted.
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::to_value(self)
      .ok()
      .and_then(|full| full.get("params").cloned())
      .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
  }

  fn validate(&self) -> Result<(), String> {
    match self {
      Self::AllowedFileTypes(p) => p.validate(),
      Self::MaxFileSize(p) => p.validate(),
      Self::WithinTimerange(p) => p.validate(),
      Self::StrictTimestampOrdering(_) | Self::SameDevice(_) | Self::NoModification(_) => Ok(()),
    }
  }

  pub(crate) fn rule(&self) -> &dyn Rule {
    match self {
      Self::AllowedFileTypes(p) => p,
      Self::MaxFileSize(p) => p,
      Self::StrictTimestampOrdering(p) => p,
      Self::SameDevice(p) => p,
      Self::WithinTimerange(p) => p,
      Self::NoModification(p) => p,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn params_shape_is_checked_per_key() {
    let ok = RuleParams::from_parts(RuleKey::MaxFileSize, &json!({ "maxBytes": 5_000_000 }));
    assert_eq!(ok.unwrap(), RuleParams::MaxFileSize(MaxFileSize { max_bytes: 5_000_000 }));

    for (key, params) in [
      (RuleKey::MaxFileSize, json!({})),
      (RuleKey::MaxFileSize, json!({ "maxBytes": "big" })),
      (RuleKey::MaxFileSize, json!({ "maxBytes": 0 })),
      (RuleKey::SameDevice, json!({ "strict": true })),
      (RuleKey::AllowedFileTypes, json!({ "allowedFileTypes": [] })),
      (RuleKey::WithinTimerange, json!({ "start": "2024-05-01T00:00:00" })),
      (RuleKey::NoModification, json!({ "blockedSoftware": "gimp" })),
    ] {
      let err = RuleParams::from_parts(key, &params).unwrap_err();
      assert!(
        matches!(err, RuleError::InvalidParams { key: k, .. } if k == key),
        "{key} accepted {params}"
      );
    }
  }

  #[test]
  fn empty_params_are_accepted_where_nothing_is_required() {
    for key in [RuleKey::StrictTimestampOrdering, RuleKey::SameDevice, RuleKey::NoModification] {
      let params = RuleParams::from_parts(key, &json!({})).unwrap();
      assert_eq!(params.key(), key);
      assert_eq!(params.to_json(), json!({}));
    }
  }
}
