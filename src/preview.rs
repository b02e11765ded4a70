use crate::plan::Plan;
use colored::Colorize;
use std::{collections::BTreeMap, path::Path};

/// A directory (with children) or a file in the previewed destination.
#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
    is_file: bool,
}

/// Folds the planned relative paths into a tree rooted at the destination.
fn build_tree(plan: &Plan) -> Node {
    let mut root = Node::default();

    for entry in &plan.entries {
        let mut node = &mut root;
        for component in entry.destination.components() {
            let name = component.as_os_str().to_string_lossy().to_string();
            node = node.children.entry(name).or_default();
        }
        node.is_file = entry.is_file;
    }

    root
}

fn print_children(node: &Node, prefix: &str) {
    let len = node.children.len();

    for (i, (name, child)) in node.children.iter().enumerate() {
        let is_last = i + 1 == len;
        let connector = if is_last { "└── " } else { "├── " };
        let label = if child.is_file {
            name.green()
        } else {
            name.blue()
        };
        println!("{}{}{}", prefix.yellow(), connector.yellow(), label);

        let nested = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        print_children(child, &nested);
    }
}

/// Prints what a staging run will write into `destination`.
pub fn preview_as_tree(plan: &Plan, destination: &Path) {
    let tree = build_tree(plan);

    println!(
        "Legend: {} = (directory), {} = (file)",
        "blue".blue(),
        "green".green()
    );
    println!(
        "\n{} {}\n",
        "┌─".bold().bright_blue(),
        "Staging plan".bold().bright_blue()
    );

    println!("{}", destination.display().to_string().blue());
    print_children(&tree, "");

    println!(
        "\n{} {}\n",
        "└─".bold().bright_blue(),
        format!(
            "{} files, {} directories",
            plan.files(),
            plan.directories()
        )
        .bright_green()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tree_nests_entries_under_their_parents() {
        let mut plan = Plan::default();
        plan.push(PathBuf::from("_internal"), false);
        plan.push(PathBuf::from("_internal/base.zip"), true);
        plan.push(PathBuf::from("main"), true);

        let tree = build_tree(&plan);

        assert_eq!(tree.children.len(), 2);
        let internal = &tree.children["_internal"];
        assert!(!internal.is_file);
        assert!(internal.children["base.zip"].is_file);
        assert!(tree.children["main"].is_file);
    }
}
