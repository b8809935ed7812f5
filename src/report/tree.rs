// src/report/tree.rs
// =============================================================================
// Renders a RepositoryStructure as a sorted directory tree:
//
//   Repository structure:
//   ├── docs
//   │   └── index.md
//   └── README.md
//
// Paths are the request-relative ones, i.e. the layout a download produces.
// =============================================================================

use crate::structure::RepositoryStructure;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
    is_file: bool,
}

impl Node {
    fn insert(&mut self, path: &str, is_file: bool) {
        let mut current = self;
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        while let Some(part) = parts.next() {
            current = current.children.entry(part.to_string()).or_default();
            if parts.peek().is_none() {
                current.is_file |= is_file;
            }
        }
    }

    fn render(&self, indent: &str, out: &mut String) {
        let last = self.children.len().saturating_sub(1);
        for (i, (name, child)) in self.children.iter().enumerate() {
            let (connector, next_indent) = if i == last {
                ("└── ", format!("{}    ", indent))
            } else {
                ("├── ", format!("{}│   ", indent))
            };
            // Writing to a String cannot fail
            let _ = writeln!(out, "{}{}{}", indent, connector, name);
            if !child.is_file {
                child.render(&next_indent, out);
            }
        }
    }
}

pub fn render_tree(structure: &RepositoryStructure) -> String {
    let mut out = String::from("Repository structure:\n");
    if structure.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }

    let mut root = Node::default();
    for folder in &structure.folders {
        root.insert(folder, false);
    }
    for file in &structure.files {
        root.insert(&file.request_path, true);
    }
    root.render("", &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::FileDescriptor;

    fn file(request_path: &str) -> FileDescriptor {
        FileDescriptor {
            path: request_path.to_string(),
            name: request_path.rsplit('/').next().unwrap().to_string(),
            sha: String::new(),
            size: 0,
            url: String::new(),
            html_url: None,
            git_url: None,
            download_url: None,
            request_path: request_path.to_string(),
        }
    }

    #[test]
    fn test_empty_structure() {
        let rendered = render_tree(&RepositoryStructure::default());
        assert_eq!(rendered, "Repository structure:\n  (empty)\n");
    }

    #[test]
    fn test_nested_tree_is_sorted() {
        let structure = RepositoryStructure {
            files: vec![file("src/main.rs"), file("README.md"), file("src/lib/util.rs")],
            folders: vec!["src".to_string(), "src/lib".to_string()],
        };
        let expected = "\
Repository structure:
├── README.md
└── src
    ├── lib
    │   └── util.rs
    └── main.rs
";
        assert_eq!(render_tree(&structure), expected);
    }
}
