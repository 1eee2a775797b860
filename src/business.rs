//! Stage 3: semantic invariants spanning several declared entities.
//!
//! All identified entities share one id namespace, built in a single pass; every
//! reference is then resolved against it with a hash lookup.

use std::collections::{HashMap, HashSet};
use std::fmt;

use roxmltree::Node;

use crate::diagnostics::{ErrorCode, ValidationError, ValidationWarning};
use crate::model::{Token, TransformationType};
use crate::suggest::did_you_mean;
use crate::tree::{
    XmlTree, attribute, child, child_text, children, locate, locate_attribute, reference, xpath,
};

/// Kind of entity an id was declared on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Connection,
    Transformation,
    Endpoint,
}

impl EntityKind {
    fn element(self) -> &'static str {
        match self {
            EntityKind::Connection => "connection",
            EntityKind::Transformation => "transformation",
            EntityKind::Endpoint => "endpoint",
        }
    }

    fn collection(self) -> &'static str {
        match self {
            EntityKind::Connection => "connections",
            EntityKind::Transformation => "transformations",
            EntityKind::Endpoint => "endpoints",
        }
    }

    /// Attribute carrying the identifier of this kind of entity
    fn id_attribute(self) -> &'static str {
        match self {
            EntityKind::Endpoint => "operationId",
            EntityKind::Connection | EntityKind::Transformation => "id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element())
    }
}

const DECLARING_KINDS: [EntityKind; 3] = [
    EntityKind::Connection,
    EntityKind::Transformation,
    EntityKind::Endpoint,
];

/// Every declared id in the document, first declaration wins
pub struct IdNamespace<'a, 'input> {
    declarations: HashMap<&'a str, (EntityKind, Node<'a, 'input>)>,
    /// Later declarations of an id already in the namespace, in document order
    duplicates: Vec<(&'a str, EntityKind, Node<'a, 'input>)>,
}

impl<'a, 'input> IdNamespace<'a, 'input> {
    pub fn build(root: Node<'a, 'input>) -> Self {
        let mut declarations = HashMap::new();
        let mut duplicates = Vec::new();

        for kind in DECLARING_KINDS {
            let Some(collection) = child(root, kind.collection()) else {
                continue;
            };
            for node in children(collection, kind.element()) {
                let Some(id) = attribute(node, kind.id_attribute()) else {
                    continue;
                };
                if declarations.contains_key(id) {
                    duplicates.push((id, kind, node));
                } else {
                    declarations.insert(id, (kind, node));
                }
            }
        }

        Self {
            declarations,
            duplicates,
        }
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.declarations.get(id).map(|(kind, _)| *kind)
    }

    pub fn resolves(&self, id: &str, kind: EntityKind) -> bool {
        self.kind_of(id) == Some(kind)
    }

    /// Declared ids of one kind, sorted for stable suggestions
    pub fn ids_of(&self, kind: EntityKind) -> Vec<&'a str> {
        let mut ids: Vec<&'a str> = self
            .declarations
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// A reference field and the kind of entity it must resolve to
struct Reference<'a, 'input> {
    node: Node<'a, 'input>,
    attr: &'static str,
    target: &'a str,
    expected: EntityKind,
}

#[derive(Debug, Clone, Default)]
pub struct BusinessRuleValidator;

impl BusinessRuleValidator {
    pub fn new() -> Self {
        Self
    }

    /// Uniqueness and referential-integrity errors
    pub fn validate(&self, tree: &XmlTree<'_>) -> Vec<ValidationError> {
        let root = tree.root();
        if root.tag_name().name() != "process" {
            return Vec::new();
        }

        let namespace = IdNamespace::build(root);
        let mut errors = Vec::new();

        for (id, kind, node) in &namespace.duplicates {
            let first = namespace
                .declarations
                .get(id)
                .map(|(first_kind, first_node)| format!("{} at {}", first_kind, xpath(*first_node)))
                .unwrap_or_default();
            errors.push(
                ValidationError::error(
                    ErrorCode::DuplicateId,
                    format!(
                        "Duplicate id '{}' on {}; already declared by {}",
                        id, kind, first
                    ),
                )
                .at(locate_attribute(*node, kind.id_attribute())),
            );
        }

        for reference in collect_references(root) {
            if namespace.resolves(reference.target, reference.expected) {
                continue;
            }

            let code = match reference.expected {
                EntityKind::Transformation => ErrorCode::InvalidTransformationRef,
                _ => ErrorCode::InvalidConnectionRef,
            };
            let message = match namespace.kind_of(reference.target) {
                Some(actual) => format!(
                    "'{}' refers to a {}, expected a {}",
                    reference.target, actual, reference.expected
                ),
                None => format!(
                    "'{}' does not match any declared {} id",
                    reference.target, reference.expected
                ),
            };
            let candidates = namespace.ids_of(reference.expected);
            errors.push(
                ValidationError::error(code, message)
                    .at(locate_attribute(reference.node, reference.attr))
                    .with_suggestion(did_you_mean(reference.target, candidates)),
            );
        }

        errors
    }

    /// Non-blocking advisories about the document
    pub fn advise(&self, tree: &XmlTree<'_>) -> Vec<ValidationWarning> {
        let root = tree.root();
        if root.tag_name().name() != "process" {
            return Vec::new();
        }

        let mut warnings = Vec::new();

        match child(root, "metadata") {
            Some(metadata) if child_text(metadata, "description").is_none() => warnings.push(
                ValidationWarning::info(
                    ErrorCode::MissingDescription,
                    "Process metadata has no description",
                )
                .at(locate(metadata))
                .recommend("Add a <description> so generated documentation has a summary"),
            ),
            _ => {}
        }

        if child(root, "dataFlow").is_some() {
            let referenced: HashSet<&str> =
                collect_references(root).iter().map(|r| r.target).collect();
            for (kind, code) in [
                (EntityKind::Connection, ErrorCode::UnusedConnection),
                (EntityKind::Transformation, ErrorCode::UnusedTransformation),
            ] {
                let Some(collection) = child(root, kind.collection()) else {
                    continue;
                };
                for node in children(collection, kind.element()) {
                    if let Some(id) = attribute(node, "id")
                        && !referenced.contains(id)
                    {
                        warnings.push(
                            ValidationWarning::warning(
                                code,
                                format!("{} '{}' is never referenced", kind, id),
                            )
                            .at(locate(node))
                            .recommend(format!(
                                "Reference '{}' from the data flow or remove it",
                                id
                            )),
                        );
                    }
                }
            }
        }

        if let Some(transformations) = child(root, "transformations") {
            for node in children(transformations, "transformation") {
                let needs_expression = attribute(node, "type")
                    .map(TransformationType::from_token)
                    .is_some_and(|kind| {
                        matches!(
                            kind,
                            TransformationType::Filter | TransformationType::Expression
                        )
                    });
                if needs_expression && child_text(node, "expression").is_none() {
                    let kind = attribute(node, "type").unwrap_or_default();
                    warnings.push(
                        ValidationWarning::warning(
                            ErrorCode::EmptyExpression,
                            format!(
                                "{} transformation '{}' has no expression",
                                kind,
                                attribute(node, "id").unwrap_or("?")
                            ),
                        )
                        .at(locate(node))
                        .recommend("Add an <expression> describing the rule it applies"),
                    );
                }
            }
        }

        if let Some(endpoints) = child(root, "endpoints") {
            for node in children(endpoints, "endpoint") {
                let has_responses = child(node, "responses")
                    .is_some_and(|responses| children(responses, "response").next().is_some());
                if !has_responses {
                    warnings.push(
                        ValidationWarning::warning(
                            ErrorCode::MissingResponses,
                            format!(
                                "Endpoint {} {} declares no responses",
                                attribute(node, "method").unwrap_or("?"),
                                attribute(node, "path").unwrap_or("?")
                            ),
                        )
                        .at(locate(node))
                        .recommend("Document at least the success response"),
                    );
                }
            }
        }

        warnings
    }
}

/// Every reference field in the document, in document order
fn collect_references<'a, 'input>(root: Node<'a, 'input>) -> Vec<Reference<'a, 'input>> {
    let mut references = Vec::new();

    if let Some(data_flow) = child(root, "dataFlow") {
        for role in ["source", "target"] {
            if let Some(end) = child(data_flow, role)
                && let Some(target) = attribute(end, "connectionRef")
            {
                references.push(Reference {
                    node: end,
                    attr: "connectionRef",
                    target,
                    expected: EntityKind::Connection,
                });
            }
        }

        for entry in data_flow
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "transformationRef")
        {
            if let Some(target) = reference(entry) {
                references.push(Reference {
                    node: entry,
                    attr: "ref",
                    target,
                    expected: EntityKind::Transformation,
                });
            }
        }
    }

    if let Some(endpoints) = child(root, "endpoints") {
        for endpoint in children(endpoints, "endpoint") {
            if let Some(target) = attribute(endpoint, "connectionRef") {
                references.push(Reference {
                    node: endpoint,
                    attr: "connectionRef",
                    target,
                    expected: EntityKind::Connection,
                });
            }
        }
    }

    references
}
