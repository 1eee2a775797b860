//! Stage 2: structural conformance for the declared process type.
//!
//! Rules are declarative tables: which top-level elements a process type requires, and
//! which attributes and values each entity element must carry. Every violation is an
//! ERROR; nothing here ends the pipeline.

use roxmltree::Node;

use crate::diagnostics::{ErrorCode, ValidationError};
use crate::model::{
    AuthenticationType, ConnectionType, HttpMethod, ParameterLocation, ProcessType, Token,
    TransformationType,
};
use crate::suggest::did_you_mean;
use crate::tree::{
    XmlTree, attribute, attribute_or_child, child, child_text, children, locate, locate_attribute,
    reference,
};

/// Structural requirements selected by the declared process type
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessRules {
    pub process_type: Option<ProcessType>,
    /// Direct children of `<process>` that must be present
    pub required_elements: &'static [&'static str],
    pub min_connections: usize,
}

/// Applied when the process type is missing or unknown
static BASELINE_RULES: ProcessRules = ProcessRules {
    process_type: None,
    required_elements: &["metadata"],
    min_connections: 0,
};

static APPLICATION_INTEGRATION_RULES: ProcessRules = ProcessRules {
    process_type: Some(ProcessType::ApplicationIntegration),
    required_elements: &["metadata", "connections"],
    min_connections: 1,
};

static DATA_INTEGRATION_RULES: ProcessRules = ProcessRules {
    process_type: Some(ProcessType::DataIntegration),
    required_elements: &["metadata", "connections", "dataFlow"],
    min_connections: 1,
};

impl ProcessRules {
    pub fn for_type(process_type: Option<ProcessType>) -> &'static ProcessRules {
        match process_type {
            Some(ProcessType::ApplicationIntegration) => &APPLICATION_INTEGRATION_RULES,
            Some(ProcessType::DataIntegration) => &DATA_INTEGRATION_RULES,
            None => &BASELINE_RULES,
        }
    }
}

/// Required attributes and values of one entity element
struct EntityRule {
    element: &'static str,
    attributes: &'static [&'static str],
    /// Values accepted either as an attribute or as a child element
    values: &'static [&'static str],
}

const CONNECTION_RULE: EntityRule = EntityRule {
    element: "connection",
    attributes: &["id", "type"],
    values: &[],
};

const AUTHENTICATION_RULE: EntityRule = EntityRule {
    element: "authentication",
    attributes: &["type"],
    values: &[],
};

const TRANSFORMATION_RULE: EntityRule = EntityRule {
    element: "transformation",
    attributes: &["id", "type"],
    values: &["name"],
};

const FIELD_RULE: EntityRule = EntityRule {
    element: "field",
    attributes: &["name", "type"],
    values: &[],
};

const ENDPOINT_RULE: EntityRule = EntityRule {
    element: "endpoint",
    attributes: &["path", "method"],
    values: &[],
};

const PARAMETER_RULE: EntityRule = EntityRule {
    element: "parameter",
    attributes: &["name", "in"],
    values: &[],
};

const RESPONSE_RULE: EntityRule = EntityRule {
    element: "response",
    attributes: &["code"],
    values: &[],
};

const FLOW_ENDPOINT_RULE: EntityRule = EntityRule {
    element: "source/target",
    attributes: &["connectionRef", "entity"],
    values: &[],
};

const BOOLEAN_LITERALS: &[&str] = &["true", "false"];

/// Process type declared on the root element, if it is a known one
pub fn declared_process_type(tree: &XmlTree<'_>) -> Option<ProcessType> {
    attribute(tree.root(), "type").and_then(ProcessType::parse)
}

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check the tree against the rules of `declared`; empty when fully conformant
    pub fn validate(
        &self,
        tree: &XmlTree<'_>,
        declared: Option<ProcessType>,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let root = tree.root();

        if root.tag_name().name() != "process" {
            errors.push(
                ValidationError::error(
                    ErrorCode::InvalidRootElement,
                    format!(
                        "Root element is <{}>, expected <process>",
                        root.tag_name().name()
                    ),
                )
                .at(locate(root)),
            );
            return errors;
        }

        check_process_attributes(root, &mut errors);
        check_required_elements(root, ProcessRules::for_type(declared), &mut errors);

        if let Some(connections) = child(root, "connections") {
            check_connections(connections, ProcessRules::for_type(declared), &mut errors);
        }
        if let Some(transformations) = child(root, "transformations") {
            for transformation in children(transformations, "transformation") {
                check_transformation(transformation, &mut errors);
            }
        }
        if let Some(endpoints) = child(root, "endpoints") {
            for endpoint in children(endpoints, "endpoint") {
                check_endpoint(endpoint, &mut errors);
            }
        }
        if let Some(data_flow) = child(root, "dataFlow") {
            check_data_flow(data_flow, &mut errors);
        }

        errors
    }
}

fn check_process_attributes(root: Node<'_, '_>, errors: &mut Vec<ValidationError>) {
    if attribute(root, "name").is_none() {
        errors.push(missing_attribute(root, "process", "name"));
    }

    match attribute(root, "type") {
        None => errors.push(missing_attribute(root, "process", "type")),
        Some(raw) if ProcessType::parse(raw).is_none() => errors.push(
            ValidationError::error(
                ErrorCode::InvalidProcessType,
                format!(
                    "Unknown process type '{}'; expected one of {}",
                    raw,
                    ProcessType::KNOWN.join(", ")
                ),
            )
            .at(locate_attribute(root, "type"))
            .with_suggestion(did_you_mean(raw, ProcessType::KNOWN.iter().copied())),
        ),
        Some(_) => {}
    }

    if let Some(version) = attribute(root, "version")
        && !is_dotted_version(version)
    {
        errors.push(
            ValidationError::error(
                ErrorCode::InvalidValue,
                format!(
                    "Version '{}' must be dot-separated digits such as '1.0'",
                    version
                ),
            )
            .at(locate_attribute(root, "version")),
        );
    }
}

fn check_required_elements(
    root: Node<'_, '_>,
    rules: &ProcessRules,
    errors: &mut Vec<ValidationError>,
) {
    for name in rules.required_elements {
        if child(root, name).is_none() {
            let scope = match rules.process_type {
                Some(process_type) => format!("a {} process", process_type),
                None => "every process".to_string(),
            };
            errors.push(
                ValidationError::error(
                    ErrorCode::MissingElement,
                    format!("<{}> is required for {}", name, scope),
                )
                .at(locate(root)),
            );
        }
    }
}

fn check_connections(
    connections: Node<'_, '_>,
    rules: &ProcessRules,
    errors: &mut Vec<ValidationError>,
) {
    let mut count = 0;
    for connection in children(connections, "connection") {
        count += 1;
        require(connection, &CONNECTION_RULE, errors);

        if let Some(raw) = attribute(connection, "type") {
            check_token::<ConnectionType>(
                connection,
                "type",
                raw,
                ErrorCode::InvalidConnectionType,
                "connection type",
                errors,
            );

            let kind = ConnectionType::from_token(raw);
            let label = attribute(connection, "id").unwrap_or("?");
            if kind.is_network() && child_text(connection, "url").is_none() {
                errors.push(
                    ValidationError::error(
                        ErrorCode::MissingElement,
                        format!(
                            "{} connection '{}' requires a <url>",
                            kind.as_str(),
                            label
                        ),
                    )
                    .at(locate(connection)),
                );
            }
            if kind.is_storage() && child_text(connection, "host").is_none() {
                errors.push(
                    ValidationError::error(
                        ErrorCode::MissingElement,
                        format!(
                            "{} connection '{}' requires a <host>",
                            kind.as_str(),
                            label
                        ),
                    )
                    .at(locate(connection)),
                );
            }
        }

        if let Some(port_node) = child(connection, "port") {
            let raw = port_node.text().unwrap_or("").trim();
            if !matches!(raw.parse::<u16>(), Ok(port) if port > 0) {
                errors.push(
                    ValidationError::error(
                        ErrorCode::InvalidValue,
                        format!("Port '{}' must be an integer between 1 and 65535", raw),
                    )
                    .at(locate(port_node)),
                );
            }
        }

        if let Some(auth) = child(connection, "authentication") {
            require(auth, &AUTHENTICATION_RULE, errors);
            if let Some(raw) = attribute(auth, "type") {
                check_token::<AuthenticationType>(
                    auth,
                    "type",
                    raw,
                    ErrorCode::InvalidAuthenticationType,
                    "authentication type",
                    errors,
                );
            }
        }
    }

    if count < rules.min_connections {
        errors.push(
            ValidationError::error(
                ErrorCode::MissingElement,
                format!(
                    "<connections> must declare at least {} <connection>",
                    rules.min_connections
                ),
            )
            .at(locate(connections)),
        );
    }
}

fn check_transformation(transformation: Node<'_, '_>, errors: &mut Vec<ValidationError>) {
    require(transformation, &TRANSFORMATION_RULE, errors);

    if let Some(raw) = attribute(transformation, "type") {
        check_token::<TransformationType>(
            transformation,
            "type",
            raw,
            ErrorCode::InvalidTransformationType,
            "transformation type",
            errors,
        );
    }

    for group in ["inputFields", "outputFields"] {
        if let Some(fields) = child(transformation, group) {
            for field in children(fields, "field") {
                require(field, &FIELD_RULE, errors);
                check_boolean(field, "required", errors);
            }
        }
    }
}

fn check_endpoint(endpoint: Node<'_, '_>, errors: &mut Vec<ValidationError>) {
    require(endpoint, &ENDPOINT_RULE, errors);

    if let Some(path) = attribute(endpoint, "path")
        && !path.starts_with('/')
    {
        errors.push(
            ValidationError::error(
                ErrorCode::InvalidValue,
                format!("Endpoint path '{}' must start with '/'", path),
            )
            .at(locate_attribute(endpoint, "path"))
            .with_suggestion(Some(format!("did you mean '/{}'?", path))),
        );
    }

    if let Some(raw) = attribute(endpoint, "method") {
        check_token::<HttpMethod>(
            endpoint,
            "method",
            raw,
            ErrorCode::InvalidHttpMethod,
            "HTTP method",
            errors,
        );
    }

    if let Some(parameters) = child(endpoint, "parameters") {
        for parameter in children(parameters, "parameter") {
            require(parameter, &PARAMETER_RULE, errors);
            if let Some(raw) = attribute(parameter, "in") {
                check_token::<ParameterLocation>(
                    parameter,
                    "in",
                    raw,
                    ErrorCode::InvalidParameterLocation,
                    "parameter location",
                    errors,
                );
            }
            check_boolean(parameter, "required", errors);
        }
    }

    if let Some(responses) = child(endpoint, "responses") {
        for response in children(responses, "response") {
            require(response, &RESPONSE_RULE, errors);
            if let Some(code) = attribute(response, "code")
                && !is_status_code(code)
            {
                errors.push(
                    ValidationError::error(
                        ErrorCode::InvalidValue,
                        format!(
                            "Response code '{}' must be a three-digit status or 'default'",
                            code
                        ),
                    )
                    .at(locate_attribute(response, "code")),
                );
            }
        }
    }
}

fn check_data_flow(data_flow: Node<'_, '_>, errors: &mut Vec<ValidationError>) {
    for role in ["source", "target"] {
        match child(data_flow, role) {
            Some(end) => require(end, &FLOW_ENDPOINT_RULE, errors),
            None => errors.push(
                ValidationError::error(
                    ErrorCode::MissingElement,
                    format!("<dataFlow> requires a <{}>", role),
                )
                .at(locate(data_flow)),
            ),
        }
    }

    for entry in data_flow
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "transformationRef")
    {
        if reference(entry).is_none() {
            errors.push(missing_attribute(entry, "transformationRef", "ref"));
        }
    }
}

fn require(node: Node<'_, '_>, rule: &EntityRule, errors: &mut Vec<ValidationError>) {
    let element = if rule.element.contains('/') {
        node.tag_name().name()
    } else {
        rule.element
    };

    for name in rule.attributes {
        if attribute(node, name).is_none() {
            errors.push(missing_attribute(node, element, name));
        }
    }

    for name in rule.values {
        if attribute_or_child(node, name).is_none() {
            errors.push(
                ValidationError::error(
                    ErrorCode::MissingElement,
                    format!(
                        "<{}> requires a '{}' attribute or <{}> child",
                        element, name, name
                    ),
                )
                .at(locate(node)),
            );
        }
    }
}

fn check_token<T: Token>(
    node: Node<'_, '_>,
    attr: &str,
    raw: &str,
    code: ErrorCode,
    what: &str,
    errors: &mut Vec<ValidationError>,
) {
    if T::from_token(raw).is_known() {
        return;
    }
    errors.push(
        ValidationError::error(
            code,
            format!(
                "Unknown {} '{}'; expected one of {}",
                what,
                raw,
                T::KNOWN.join(", ")
            ),
        )
        .at(locate_attribute(node, attr))
        .with_suggestion(did_you_mean(raw, T::KNOWN.iter().copied())),
    );
}

fn check_boolean(node: Node<'_, '_>, attr: &str, errors: &mut Vec<ValidationError>) {
    if let Some(raw) = attribute(node, attr)
        && !BOOLEAN_LITERALS.contains(&raw)
    {
        errors.push(
            ValidationError::error(
                ErrorCode::InvalidValue,
                format!(
                    "Attribute '{}' on <{}> must be 'true' or 'false', found '{}'",
                    attr,
                    node.tag_name().name(),
                    raw
                ),
            )
            .at(locate_attribute(node, attr))
            .with_suggestion(did_you_mean(raw, BOOLEAN_LITERALS.iter().copied())),
        );
    }
}

fn missing_attribute(node: Node<'_, '_>, element: &str, name: &str) -> ValidationError {
    ValidationError::error(
        ErrorCode::MissingAttribute,
        format!("<{}> is missing required attribute '{}'", element, name),
    )
    .at(locate_attribute(node, name))
}

fn is_dotted_version(version: &str) -> bool {
    version
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn is_status_code(code: &str) -> bool {
    code == "default"
        || (code.len() == 3
            && code.chars().all(|c| c.is_ascii_digit())
            && matches!(code.as_bytes()[0], b'1'..=b'5'))
}
