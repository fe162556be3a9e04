//! ComfyUI workflow template handling.
//!
//! A workflow is an opaque JSON mapping of node ids to node objects,
//! each with an `inputs` mapping. The template passes through to the
//! server untouched except for the two fields the pipeline addresses
//! before submission: the prompt text of one node and the
//! width/height/batch_size inputs of another. No other validation is
//! performed here; malformed workflows are rejected by the server.

use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::CoreError;

/// A mutable ComfyUI workflow document.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    root: Value,
}

impl WorkflowTemplate {
    /// Wrap an already-parsed workflow document.
    ///
    /// The root must be a JSON object (node id -> node).
    pub fn from_value(root: Value) -> Result<Self, CoreError> {
        if !root.is_object() {
            return Err(CoreError::Validation(
                "Workflow root must be a JSON object".to_string(),
            ));
        }
        Ok(Self { root })
    }

    /// Parse a workflow from raw JSON text.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Load a workflow template from a file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Set the generation prompt on the given text node.
    pub fn set_prompt_text(&mut self, node_id: &str, text: &str) -> Result<(), CoreError> {
        self.node_inputs(node_id)?
            .insert("text".to_string(), Value::String(text.to_string()));
        Ok(())
    }

    /// Set the output dimensions and batch size on the given node.
    pub fn set_dimensions(
        &mut self,
        node_id: &str,
        width: u32,
        height: u32,
        batch_size: u32,
    ) -> Result<(), CoreError> {
        let inputs = self.node_inputs(node_id)?;
        inputs.insert("width".to_string(), json!(width));
        inputs.insert("height".to_string(), json!(height));
        inputs.insert("batch_size".to_string(), json!(batch_size));
        Ok(())
    }

    /// The workflow document, as submitted to the server.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Look up the `inputs` object of a node.
    fn node_inputs(&mut self, node_id: &str) -> Result<&mut Map<String, Value>, CoreError> {
        let node = self
            .root
            .get_mut(node_id)
            .ok_or_else(|| CoreError::Validation(format!("Workflow has no node {node_id}")))?;
        node.get_mut("inputs")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                CoreError::Validation(format!("Workflow node {node_id} has no inputs object"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowTemplate {
        WorkflowTemplate::from_value(json!({
            "5": { "class_type": "EmptyLatentImage", "inputs": { "width": 512, "height": 512, "batch_size": 1 } },
            "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "placeholder" } },
        }))
        .unwrap()
    }

    #[test]
    fn sets_prompt_text() {
        let mut wf = sample();
        wf.set_prompt_text("6", "a cat in the rain").unwrap();
        assert_eq!(
            wf.as_value()["6"]["inputs"]["text"],
            json!("a cat in the rain")
        );
    }

    #[test]
    fn sets_dimensions_and_batch_size() {
        let mut wf = sample();
        wf.set_dimensions("5", 1024, 512, 1).unwrap();
        assert_eq!(wf.as_value()["5"]["inputs"]["width"], json!(1024));
        assert_eq!(wf.as_value()["5"]["inputs"]["height"], json!(512));
        assert_eq!(wf.as_value()["5"]["inputs"]["batch_size"], json!(1));
    }

    #[test]
    fn untouched_nodes_survive_mutation() {
        let mut wf = sample();
        wf.set_prompt_text("6", "new text").unwrap();
        assert_eq!(wf.as_value()["5"]["class_type"], json!("EmptyLatentImage"));
    }

    #[test]
    fn missing_node_is_a_validation_error() {
        let mut wf = sample();
        let err = wf.set_prompt_text("99", "text").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn node_without_inputs_is_a_validation_error() {
        let mut wf = WorkflowTemplate::from_value(json!({ "7": { "class_type": "SaveImage" } })).unwrap();
        let err = wf.set_dimensions("7", 512, 512, 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(WorkflowTemplate::from_value(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            WorkflowTemplate::from_json("not json"),
            Err(CoreError::Json(_))
        ));
    }
}
