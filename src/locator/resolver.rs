use crate::error::{DriverError, Result};
use crate::locator::query::{Axis, Condition, Operand, Predicate, Query, Step};
use crate::ui::node::UiNode;
use crate::ui::snapshot::Snapshot;

/// Where a step starts from.
#[derive(Clone, Copy)]
enum Context<'a> {
    /// Virtual parent of the root element
    Document(&'a UiNode),
    Node(&'a UiNode),
}

/// Evaluate `query` against the whole snapshot. Results are in document
/// order, without duplicates.
pub fn resolve<'a>(query: &Query, snapshot: &'a Snapshot) -> Vec<&'a UiNode> {
    evaluate(query, Context::Document(&snapshot.root))
}

/// Evaluate `query` from a context element. Absolute queries ignore the
/// context and search the whole document.
pub fn resolve_from<'a>(query: &Query, snapshot: &'a Snapshot, context: &'a UiNode) -> Vec<&'a UiNode> {
    if query.relative {
        evaluate(query, Context::Node(context))
    } else {
        evaluate(query, Context::Document(&snapshot.root))
    }
}

/// First match in document order.
pub fn resolve_one<'a>(query: &Query, snapshot: &'a Snapshot) -> Result<&'a UiNode> {
    resolve(query, snapshot)
        .into_iter()
        .next()
        .ok_or_else(|| DriverError::NoSuchElement {
            selector: query.to_string(),
        })
}

fn evaluate<'a>(query: &Query, start: Context<'a>) -> Vec<&'a UiNode> {
    let mut contexts = vec![start];

    for step in &query.steps {
        let mut matched: Vec<&'a UiNode> = Vec::new();
        for context in &contexts {
            for group in candidate_groups(*context, step.axis) {
                matched.extend(apply_step(step, group));
            }
        }
        matched.sort_by_key(|n| n.order);
        matched.dedup_by_key(|n| n.order);

        if matched.is_empty() {
            return matched;
        }
        contexts = matched.into_iter().map(Context::Node).collect();
    }

    contexts
        .into_iter()
        .filter_map(|c| match c {
            Context::Node(n) => Some(n),
            Context::Document(_) => None,
        })
        .collect()
}

/// Sibling lists the step's name test and predicates run over. Positions in
/// predicates are relative to one group, as in XPath's `//x[2]`.
fn candidate_groups<'a>(context: Context<'a>, axis: Axis) -> Vec<Vec<&'a UiNode>> {
    match (context, axis) {
        (Context::Document(root), Axis::Child) => vec![vec![root]],
        (Context::Document(root), Axis::Descendant) => {
            let mut groups = vec![vec![root]];
            groups.extend(
                root.self_and_descendants()
                    .into_iter()
                    .map(|n| n.children.iter().collect::<Vec<_>>()),
            );
            groups
        }
        (Context::Node(node), Axis::Child) => vec![node.children.iter().collect()],
        (Context::Node(node), Axis::Descendant) => node
            .self_and_descendants()
            .into_iter()
            .map(|n| n.children.iter().collect::<Vec<_>>())
            .collect(),
    }
}

fn apply_step<'a>(step: &Step, group: Vec<&'a UiNode>) -> Vec<&'a UiNode> {
    let mut nodes: Vec<&'a UiNode> = group
        .into_iter()
        .filter(|n| step.name.matches(&n.tag))
        .collect();

    for predicate in &step.predicates {
        nodes = match predicate {
            Predicate::Position(p) => nodes.get(p - 1).map(|n| vec![*n]).unwrap_or_default(),
            Predicate::All(conditions) => nodes
                .into_iter()
                .filter(|n| conditions.iter().all(|c| condition_holds(c, n)))
                .collect(),
        };
    }
    nodes
}

fn operand_value<'a>(operand: &Operand, node: &'a UiNode) -> Option<&'a str> {
    match operand {
        Operand::Attribute(name) => node.attribute(name),
        Operand::Text => node.text(),
    }
}

fn condition_holds(condition: &Condition, node: &UiNode) -> bool {
    match condition {
        Condition::Exists(name) => node.attribute(name).is_some(),
        Condition::Equals(operand, value) => operand_value(operand, node) == Some(value.as_str()),
        Condition::Contains(operand, value) => operand_value(operand, node)
            .map(|v| v.contains(value.as_str()))
            .unwrap_or(false),
    }
}
