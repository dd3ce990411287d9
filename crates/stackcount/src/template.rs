//! Pile-type template database.
//!
//! Template JSON follows a versioned schema (`stackcount.piles.v1`):
//! each pile type maps to the expected carton count per layer, ordered
//! bottom tier first. The database is loaded once at process start and
//! only read afterwards, so it is safe to share across concurrent
//! pipeline invocations without synchronization.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

const PILE_SCHEMA_V1: &str = "stackcount.piles.v1";

/// Expected per-layer carton counts for one pile type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PileTemplate {
    pub pile_id: u32,
    pub name: String,
    /// Expected carton count per layer, index 0 = bottom tier.
    pub layer_counts: Vec<u32>,
}

impl PileTemplate {
    /// Number of layers in a complete stack of this pile type.
    pub fn n_layers(&self) -> usize {
        self.layer_counts.len()
    }

    /// Carton count of a complete stack.
    pub fn total(&self) -> u32 {
        self.layer_counts.iter().sum()
    }

    /// Sum of the first `n` layer entries, saturating at the template
    /// length.
    pub fn sum_first(&self, n: usize) -> u32 {
        let take = n.min(self.layer_counts.len());
        self.layer_counts[..take].iter().sum()
    }
}

/// Read-only lookup of pile templates by pile type identifier.
#[derive(Debug, Clone, Default)]
pub struct TemplateDb {
    templates: Vec<PileTemplate>,

    /// Fast lookup: pile ID -> index into `templates`.
    id_to_idx: HashMap<u32, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateDbSpecV1 {
    schema: String,
    piles: Vec<PileTemplate>,
}

impl TemplateDb {
    /// Build a database from templates, validating each entry.
    pub fn new(templates: Vec<PileTemplate>) -> Result<Self, String> {
        let mut db = Self {
            templates: Vec::with_capacity(templates.len()),
            id_to_idx: HashMap::with_capacity(templates.len()),
        };
        for template in templates {
            db.insert(template)?;
        }
        Ok(db)
    }

    /// Insert one template. Fails on invalid entries or duplicate IDs.
    pub fn insert(&mut self, template: PileTemplate) -> Result<(), String> {
        validate_template(&template)?;
        if self.id_to_idx.contains_key(&template.pile_id) {
            return Err(format!("duplicate pile_id {}", template.pile_id));
        }
        self.id_to_idx.insert(template.pile_id, self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    /// Look up the template for a pile type.
    pub fn get(&self, pile_id: u32) -> Option<&PileTemplate> {
        self.id_to_idx.get(&pile_id).map(|&idx| &self.templates[idx])
    }

    /// Number of configured pile types.
    pub fn n_templates(&self) -> usize {
        self.templates.len()
    }

    /// Iterator over all configured templates.
    pub fn templates(&self) -> impl Iterator<Item = &PileTemplate> {
        self.templates.iter()
    }

    /// Load a template database from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data).map_err(Into::into)
    }

    /// Parse a template database from a JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, String> {
        let spec: TemplateDbSpecV1 =
            serde_json::from_str(data).map_err(|e| format!("invalid template JSON: {}", e))?;
        if spec.schema != PILE_SCHEMA_V1 {
            return Err(format!(
                "unsupported template schema '{}' (expected '{}')",
                spec.schema, PILE_SCHEMA_V1
            ));
        }
        Self::new(spec.piles)
    }
}

fn validate_template(template: &PileTemplate) -> Result<(), String> {
    if template.name.trim().is_empty() {
        return Err(format!("pile_id {}: name must not be empty", template.pile_id));
    }

    if template.layer_counts.is_empty() {
        return Err(format!(
            "pile_id {}: layer_counts must not be empty",
            template.pile_id
        ));
    }

    if template.layer_counts.contains(&0) {
        return Err(format!(
            "pile_id {}: layer_counts must all be >= 1",
            template.pile_id
        ));
    }

    Ok(())
}
