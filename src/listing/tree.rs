// src/listing/tree.rs
//! Дерево JSON-документа (категории, вложенные настройки) для отображения
//! в админке. Узлы лежат в арене, обход идёт явным стеком без рекурсии,
//! поэтому глубина документа не ограничена стеком вызовов.

use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct DocNode {
    pub label: String,
    /// Отображаемое значение листа; у контейнеров `None`
    pub value: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub id: NodeId,
    pub depth: usize,
    pub label: String,
    pub value: Option<String>,
    pub has_children: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentTree {
    nodes: Vec<DocNode>,
}

impl DocumentTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn from_json(document: &Value) -> Self {
        let mut tree = DocumentTree { nodes: Vec::new() };
        let root = tree.push("root".to_string(), document, None);

        let mut work: Vec<(NodeId, &Value)> = vec![(root, document)];
        while let Some((id, value)) = work.pop() {
            match value {
                Value::Object(map) => {
                    for (key, child) in map {
                        let child_id = tree.push(key.clone(), child, Some(id));
                        work.push((child_id, child));
                    }
                }
                Value::Array(items) => {
                    for (index, child) in items.iter().enumerate() {
                        let child_id = tree.push(item_label(child, index), child, Some(id));
                        work.push((child_id, child));
                    }
                }
                _ => {}
            }
        }

        tree
    }

    fn push(&mut self, label: String, value: &Value, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DocNode {
            label,
            value: scalar_display(value),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DocNode> {
        self.nodes.get(id.0)
    }

    /// Все строки в прямом порядке
    pub fn rows(&self) -> Vec<TreeRow> {
        self.walk(|_| true)
    }

    /// Строки с учётом раскрытых узлов: потомки показываются только у раскрытых
    pub fn visible_rows(&self, expanded: &HashSet<NodeId>) -> Vec<TreeRow> {
        self.walk(|id| expanded.contains(&id))
    }

    fn walk<F>(&self, descend: F) -> Vec<TreeRow>
    where
        F: Fn(NodeId) -> bool,
    {
        let mut rows = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return rows;
        }

        let mut stack = vec![(Self::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.0];
            rows.push(TreeRow {
                id,
                depth,
                label: node.label.clone(),
                value: node.value.clone(),
                has_children: !node.children.is_empty(),
            });

            if descend(id) {
                // В обратном порядке, чтобы первый ребёнок снимался со стека первым
                for child in node.children.iter().rev() {
                    stack.push((*child, depth + 1));
                }
            }
        }
        rows
    }

    /// Цепочка предков от корня до узла включительно
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.node(id).map(|_| id);
        while let Some(node_id) = current {
            path.push(node_id);
            current = self.nodes[node_id.0].parent;
        }
        path.reverse();
        path
    }

    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.rows().into_iter().find(|row| row.label == label).map(|row| row.id)
    }
}

fn item_label(item: &Value, index: usize) -> String {
    ["title", "name"]
        .iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| index.to_string())
}

fn scalar_display(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) | Value::Array(_) => None,
        Value::String(s) => Some(s.clone()),
        Value::Null => Some("null".to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn categories() -> DocumentTree {
        DocumentTree::from_json(&json!({
            "categories": [
                {"name": "SUV", "children": [{"name": "Compact"}, {"name": "Full-size"}]},
                {"title": "Sedan", "seats": 5},
                42
            ],
            "active": true
        }))
    }

    #[test]
    fn test_rows_are_pre_order() {
        let tree = categories();
        let labels: Vec<(usize, String)> = tree
            .rows()
            .into_iter()
            .map(|row| (row.depth, row.label))
            .collect();

        assert_eq!(labels[0], (0, "root".to_string()));
        assert_eq!(labels[1], (1, "active".to_string()));
        assert_eq!(labels[2], (1, "categories".to_string()));
        assert_eq!(labels[3], (2, "SUV".to_string()));
        assert!(labels.contains(&(4, "Compact".to_string())));
        assert!(labels.contains(&(2, "Sedan".to_string())));
        // Элемент без name/title подписан индексом
        assert!(labels.contains(&(2, "2".to_string())));
        assert_eq!(tree.rows().len(), tree.len());
    }

    #[test]
    fn test_scalar_values() {
        let tree = categories();
        let active = tree.find("active").unwrap();
        assert_eq!(tree.node(active).unwrap().value.as_deref(), Some("true"));

        let seats = tree.find("seats").unwrap();
        assert_eq!(tree.node(seats).unwrap().value.as_deref(), Some("5"));

        let categories = tree.find("categories").unwrap();
        assert_eq!(tree.node(categories).unwrap().value, None);
    }

    #[test]
    fn test_visible_rows_follow_expansion() {
        let tree = categories();
        let collapsed = tree.visible_rows(&HashSet::new());
        assert_eq!(collapsed.len(), 1);
        assert!(collapsed[0].has_children);

        let categories = tree.find("categories").unwrap();
        let expanded: HashSet<NodeId> = [DocumentTree::ROOT, categories].into_iter().collect();
        let rows = tree.visible_rows(&expanded);
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["root", "active", "categories", "SUV", "Sedan", "2"]);
    }

    #[test]
    fn test_path_to_node() {
        let tree = categories();
        let compact = tree.find("Compact").unwrap();
        let labels: Vec<String> = tree
            .path(compact)
            .into_iter()
            .map(|id| tree.node(id).unwrap().label.clone())
            .collect();
        assert_eq!(labels, vec!["root", "categories", "SUV", "children", "Compact"]);

        assert!(tree.path(NodeId(10_000)).is_empty());
    }

    #[test]
    fn test_deep_document_does_not_overflow() {
        let mut doc = json!("leaf");
        for _ in 0..1_000 {
            doc = json!([doc]);
        }
        let tree = DocumentTree::from_json(&doc);
        assert_eq!(tree.len(), 1_001);
        assert_eq!(tree.rows().last().unwrap().depth, 1_000);
    }
}
