// ABOUTME: Plugin and provider manifests that tie generated tools into one package.
// ABOUTME: The provider's tool list is append-only; every other key passes through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level plugin manifest (`manifest.yaml`). Only the name is rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

/// Provider manifest listing every tool schema in the package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderManifest {
    #[serde(default, deserialize_with = "nullable_tools")]
    pub tools: Vec<String>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

impl ProviderManifest {
    /// Append schema references after the existing entries. Existing entries
    /// are never removed or reordered.
    pub fn append_tools<I>(&mut self, refs: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.tools.extend(refs);
    }
}

fn nullable_tools<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
