//! Projection of an [`ArtifactTree`] into the nested descriptor accepted by
//! in-browser virtual filesystem mounts:
//!
//! ```json
//! { "src": { "directory": { "main.ts": { "file": { "contents": "..." } } } } }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::node::{Node, NodeKind};
use crate::tree::ArtifactTree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContents {
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountEntry {
    Directory(MountDescriptor),
    File(FileContents),
}

/// Directory listing keyed by child name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MountDescriptor(BTreeMap<String, MountEntry>);

impl MountDescriptor {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MountEntry> {
        self.0.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &MountEntry)> {
        self.0.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Flattens the descriptor back into `(path, contents)` pairs.
    #[must_use]
    pub fn file_entries(&self) -> Vec<(String, String)> {
        let mut files = Vec::new();
        collect_files(self, "", &mut files);
        files
    }
}

/// Builds the mount descriptor of `tree`. Read-only; walks the built tree.
#[must_use]
pub fn project(tree: &ArtifactTree) -> MountDescriptor {
    project_directory(tree, tree.root())
}

fn project_directory(tree: &ArtifactTree, directory: &Node) -> MountDescriptor {
    let entries = tree
        .children(directory.id())
        .map(|child| {
            let entry = match child.kind() {
                NodeKind::Directory { .. } => MountEntry::Directory(project_directory(tree, child)),
                NodeKind::File { content } => MountEntry::File(FileContents {
                    contents: content.clone(),
                }),
            };
            (child.name().to_string(), entry)
        })
        .collect();
    MountDescriptor(entries)
}

fn collect_files(descriptor: &MountDescriptor, prefix: &str, files: &mut Vec<(String, String)>) {
    for (name, entry) in descriptor.entries() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        match entry {
            MountEntry::Directory(nested) => collect_files(nested, &path, files),
            MountEntry::File(file) => files.push((path, file.contents.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::project;
    use crate::tree::ArtifactTree;
    use action_protocol::parse;
    use serde_json::json;

    #[test]
    fn projects_webcontainer_shape() {
        let mut tree = ArtifactTree::new();
        let report = parse(concat!(
            r#"<boltAction type="file" filePath="src/main.ts">boot()</boltAction>"#,
            r#"<boltAction type="folder" filePath="public"></boltAction>"#,
            r#"<boltAction type="file" filePath="index.html"><html></html></boltAction>"#,
        ));
        tree.apply(report.tokens());

        let value = serde_json::to_value(project(&tree)).expect("serializes");
        assert_eq!(
            value,
            json!({
                "src": { "directory": { "main.ts": { "file": { "contents": "boot()" } } } },
                "public": { "directory": {} },
                "index.html": { "file": { "contents": "<html></html>" } },
            })
        );
    }

    #[test]
    fn empty_tree_projects_to_empty_object() {
        let descriptor = project(&ArtifactTree::new());
        assert!(descriptor.is_empty());
        assert_eq!(descriptor.to_json().expect("serializes"), "{}");
    }
}
