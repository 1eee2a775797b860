//! Tree-to-model extraction.
//!
//! Independent of the validation engine: the parser builds its own tree and does not
//! re-validate. Extraction is tolerant of absent optional content but all-or-nothing for the
//! root element, the process name and the process type.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use roxmltree::Node;
use serde_json::Value;
use tracing::debug;

use crate::error::{ParseError, ParseResult};
use crate::model::{
    AuthenticationType, Connection, ConnectionType, DataFlow, EndpointInfo, Field, FlowEndpoint,
    HttpMethod, OpenApiEndpoint, Parameter, ParameterLocation, ParsedMetadata, ProcessType,
    Response, Token, Transformation, TransformationType,
};
use crate::tree::{attribute, attribute_or_child, child, child_text, children, reference, text};
use crate::wellformed::{WellFormedness, WellFormednessChecker};

const DEFAULT_VERSION: &str = "1.0";
const ROOT_ATTRIBUTES: &[&str] = &["name", "type", "version"];
const METADATA_FIELDS: &[&str] = &["description", "author", "created", "modified"];

#[derive(Debug, Clone, Default)]
pub struct ProcessParser {
    checker: WellFormednessChecker,
}

impl ProcessParser {
    pub fn new(allow_dtd: bool) -> Self {
        Self {
            checker: WellFormednessChecker::new(allow_dtd),
        }
    }

    /// Read and parse a process definition file
    pub async fn parse(&self, path: &Path) -> ParseResult<ParsedMetadata> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_bytes(&bytes, path)
    }

    /// Parse an in-memory document; `path` is only used in error messages
    pub fn parse_str(&self, text: &str, path: impl AsRef<Path>) -> ParseResult<ParsedMetadata> {
        self.parse_bytes(text.as_bytes(), path.as_ref())
    }

    pub fn parse_bytes(&self, bytes: &[u8], path: &Path) -> ParseResult<ParsedMetadata> {
        let tree = match self.checker.check(bytes) {
            WellFormedness::WellFormed(tree) => tree,
            WellFormedness::Malformed(error) => {
                return Err(ParseError::Malformed {
                    path: path.to_path_buf(),
                    line: error.line.unwrap_or(0),
                    column: error.column.unwrap_or(0),
                    details: error.message,
                });
            }
        };

        let root = tree.root();
        if root.tag_name().name() != "process" {
            return Err(ParseError::InvalidRoot {
                path: path.to_path_buf(),
                found: root.tag_name().name().to_string(),
            });
        }

        let process_name = attribute(root, "name").ok_or_else(|| ParseError::MissingAttribute {
            path: path.to_path_buf(),
            attribute: "name".to_string(),
        })?;
        let raw_type = attribute(root, "type").ok_or_else(|| ParseError::MissingAttribute {
            path: path.to_path_buf(),
            attribute: "type".to_string(),
        })?;
        let process_type =
            ProcessType::parse(raw_type).ok_or_else(|| ParseError::UnknownProcessType {
                path: path.to_path_buf(),
                value: raw_type.to_string(),
            })?;

        let metadata = child(root, "metadata");
        let meta = |name: &str| metadata.and_then(|m| child_text(m, name)).map(str::to_string);

        let parsed = ParsedMetadata {
            process_name: process_name.to_string(),
            process_type,
            version: attribute(root, "version")
                .unwrap_or(DEFAULT_VERSION)
                .to_string(),
            description: meta("description"),
            author: meta("author"),
            created_date: meta("created"),
            modified_date: meta("modified"),
            connections: collect(root, "connections", "connection", connection),
            transformations: collect(root, "transformations", "transformation", transformation),
            endpoints: collect(root, "endpoints", "endpoint", endpoint),
            data_flow: child(root, "dataFlow").map(data_flow),
            additional_properties: additional_properties(root, metadata),
        };

        debug!(
            path = %path.display(),
            connections = parsed.connections.len(),
            transformations = parsed.transformations.len(),
            endpoints = parsed.endpoints.len(),
            "parsed process definition"
        );
        Ok(parsed)
    }
}

fn collect<T>(
    root: Node<'_, '_>,
    collection: &str,
    element: &str,
    extract: impl Fn(Node<'_, '_>) -> Option<T>,
) -> Vec<T> {
    child(root, collection)
        .map(|c| children(c, element).filter_map(&extract).collect())
        .unwrap_or_default()
}

fn token<T: Token>(node: Node<'_, '_>, name: &str) -> T {
    T::from_token(attribute(node, name).unwrap_or_default())
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn flag(node: Node<'_, '_>, name: &str) -> bool {
    attribute(node, name) == Some("true")
}

fn connection(node: Node<'_, '_>) -> Option<Connection> {
    let id = attribute(node, "id")?;
    Some(Connection {
        id: id.to_string(),
        name: owned(attribute_or_child(node, "name")),
        connection_type: token::<ConnectionType>(node, "type"),
        endpoint: EndpointInfo {
            url: owned(child_text(node, "url")),
            host: owned(child_text(node, "host")),
            port: child_text(node, "port").and_then(|p| p.parse().ok()),
            database: owned(child_text(node, "database")),
        },
        authentication: child(node, "authentication")
            .map(|auth| token::<AuthenticationType>(auth, "type")),
    })
}

fn fields(node: Node<'_, '_>, collection: &str) -> Vec<Field> {
    let Some(list) = child(node, collection) else {
        return Vec::new();
    };
    children(list, "field")
        .filter_map(|field| {
            Some(Field {
                name: attribute(field, "name")?.to_string(),
                field_type: owned(attribute(field, "type")),
                required: flag(field, "required"),
            })
        })
        .collect()
}

fn transformation(node: Node<'_, '_>) -> Option<Transformation> {
    let id = attribute(node, "id")?;
    Some(Transformation {
        id: id.to_string(),
        name: owned(attribute_or_child(node, "name")),
        transformation_type: token::<TransformationType>(node, "type"),
        description: owned(child_text(node, "description")),
        expression: owned(child_text(node, "expression")),
        input_fields: fields(node, "inputFields"),
        output_fields: fields(node, "outputFields"),
    })
}

fn endpoint(node: Node<'_, '_>) -> Option<OpenApiEndpoint> {
    let path = attribute(node, "path")?;

    let parameters = child(node, "parameters")
        .map(|list| {
            children(list, "parameter")
                .filter_map(|p| {
                    Some(Parameter {
                        name: attribute(p, "name")?.to_string(),
                        location: token::<ParameterLocation>(p, "in"),
                        param_type: owned(attribute(p, "type")),
                        required: flag(p, "required"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut responses = BTreeMap::new();
    if let Some(list) = child(node, "responses") {
        for response in children(list, "response") {
            if let Some(code) = attribute(response, "code") {
                responses.insert(
                    code.to_string(),
                    Response {
                        code: code.to_string(),
                        description: owned(attribute(response, "description").or_else(|| text(response))),
                    },
                );
            }
        }
    }

    let tags: BTreeSet<String> = child(node, "tags")
        .map(|list| children(list, "tag").filter_map(text).map(str::to_string).collect())
        .unwrap_or_default();

    Some(OpenApiEndpoint {
        path: path.to_string(),
        method: token::<HttpMethod>(node, "method"),
        operation_id: owned(attribute(node, "operationId")),
        connection_ref: owned(attribute(node, "connectionRef")),
        summary: owned(child_text(node, "summary")),
        description: owned(child_text(node, "description")),
        parameters,
        responses,
        tags,
    })
}

fn flow_endpoint(node: Option<Node<'_, '_>>) -> FlowEndpoint {
    node.map(|end| FlowEndpoint {
        connection_ref: attribute(end, "connectionRef")
            .unwrap_or_default()
            .to_string(),
        entity: owned(attribute(end, "entity")),
    })
    .unwrap_or_default()
}

fn data_flow(node: Node<'_, '_>) -> DataFlow {
    DataFlow {
        source: flow_endpoint(child(node, "source")),
        target: flow_endpoint(child(node, "target")),
        transformation_refs: node
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "transformationRef")
            .filter_map(reference)
            .map(str::to_string)
            .collect(),
    }
}

/// Unknown root attributes, unknown metadata children, then typed `<properties>` entries
fn additional_properties(
    root: Node<'_, '_>,
    metadata: Option<Node<'_, '_>>,
) -> BTreeMap<String, Value> {
    let mut extras = BTreeMap::new();

    for attr in root.attributes() {
        if !ROOT_ATTRIBUTES.contains(&attr.name()) {
            extras.insert(attr.name().to_string(), Value::String(attr.value().to_string()));
        }
    }

    if let Some(metadata) = metadata {
        for node in metadata.children().filter(|n| n.is_element()) {
            let name = node.tag_name().name();
            if !METADATA_FIELDS.contains(&name)
                && let Some(value) = text(node)
            {
                extras.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
    }

    if let Some(properties) = child(root, "properties") {
        for property in children(properties, "property") {
            let Some(name) = attribute(property, "name") else {
                continue;
            };
            let raw = attribute(property, "value")
                .or_else(|| text(property))
                .unwrap_or_default();
            extras.insert(name.to_string(), coerce(raw, attribute(property, "type")));
        }
    }

    extras
}

/// Convert a property value according to its declared type, falling back to a string
fn coerce(raw: &str, declared: Option<&str>) -> Value {
    match declared.map(str::to_ascii_lowercase).as_deref() {
        Some("integer" | "int" | "long") => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some("number" | "double" | "float" | "decimal") => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some("boolean" | "bool") => match raw.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"<process name="OrderSync" type="data-integration">
  <metadata><description>Sync orders</description></metadata>
  <connections>
    <connection id="c1" type="REST"><name>Orders API</name><url>https://api.example.com</url></connection>
  </connections>
  <transformations>
    <transformation id="t1" type="Filter"><name>Only open</name><expression>status == 'open'</expression></transformation>
  </transformations>
  <dataFlow>
    <source connectionRef="c1" entity="Order"/>
    <target connectionRef="c1" entity="Archive"/>
    <transformationRef ref="t1"/>
  </dataFlow>
</process>"#;

    fn parse(xml: &str) -> ParseResult<ParsedMetadata> {
        ProcessParser::default().parse_str(xml, "test.xml")
    }

    #[test]
    fn test_minimal_document_round_trip() {
        let parsed = parse(MINIMAL).unwrap();

        assert_eq!(parsed.process_name, "OrderSync");
        assert_eq!(parsed.process_type, ProcessType::DataIntegration);
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.description.as_deref(), Some("Sync orders"));

        assert_eq!(parsed.connections.len(), 1);
        let connection = &parsed.connections[0];
        assert_eq!(connection.id, "c1");
        assert_eq!(connection.name.as_deref(), Some("Orders API"));
        assert_eq!(connection.connection_type, ConnectionType::Rest);
        assert_eq!(connection.endpoint.url.as_deref(), Some("https://api.example.com"));

        assert_eq!(parsed.transformations.len(), 1);
        let transformation = &parsed.transformations[0];
        assert_eq!(transformation.id, "t1");
        assert_eq!(transformation.name.as_deref(), Some("Only open"));
        assert_eq!(transformation.transformation_type, TransformationType::Filter);

        let flow = parsed.data_flow.as_ref().unwrap();
        assert_eq!(flow.source.connection_ref, "c1");
        assert_eq!(flow.source.entity.as_deref(), Some("Order"));
        assert_eq!(flow.target.entity.as_deref(), Some("Archive"));
        assert_eq!(flow.transformation_refs, vec!["t1"]);

        assert!(parsed.endpoints.is_empty());
        assert!(parsed.additional_properties.is_empty());
    }

    #[test]
    fn test_full_vocabulary() {
        let parsed = parse(
            r#"<process name="p" type="application-integration" version="2.1" owner="team-a">
  <metadata><author>ops</author><created>2024-01-01</created><team>integration</team></metadata>
  <properties>
    <property name="retries" type="integer">3</property>
    <property name="ratio" type="number">0.5</property>
    <property name="dryRun" type="boolean">TRUE</property>
    <property name="label">nightly</property>
    <property name="broken" type="integer">three</property>
  </properties>
  <connections>
    <connection id="db" type="Database">
      <host>warehouse</host><port>5432</port><database>dw</database>
      <authentication type="Basic"/>
    </connection>
    <connection id="q" type="Kafka"/>
  </connections>
  <transformations>
    <transformation id="m" type="Mapping" name="Map">
      <inputFields><field name="a" type="string" required="true"/><field type="int"/></inputFields>
      <outputFields><field name="b" required="false"/></outputFields>
    </transformation>
  </transformations>
  <endpoints>
    <endpoint path="/orders" method="GET" operationId="listOrders" connectionRef="db">
      <summary>List</summary>
      <parameters><parameter name="limit" in="query" type="integer" required="true"/></parameters>
      <responses><response code="200">OK</response><response code="default" description="Error"/></responses>
      <tags><tag>orders</tag><tag>read</tag><tag>orders</tag></tags>
    </endpoint>
  </endpoints>
  <dataFlow><source connectionRef="db"/><target connectionRef="q"/><transformationRef>m</transformationRef></dataFlow>
</process>"#,
        )
        .unwrap();

        assert_eq!(parsed.version, "2.1");
        assert_eq!(parsed.author.as_deref(), Some("ops"));
        assert_eq!(parsed.created_date.as_deref(), Some("2024-01-01"));
        assert_eq!(parsed.modified_date, None);

        let db = parsed.connection("db").unwrap();
        assert_eq!(db.endpoint.port, Some(5432));
        assert_eq!(db.endpoint.database.as_deref(), Some("dw"));
        assert_eq!(db.authentication, Some(AuthenticationType::Basic));
        assert_eq!(
            parsed.connection("q").unwrap().connection_type,
            ConnectionType::Other("Kafka".to_string())
        );

        let mapping = parsed.transformation("m").unwrap();
        assert_eq!(mapping.name.as_deref(), Some("Map"));
        assert_eq!(mapping.input_fields.len(), 1);
        assert!(mapping.input_fields[0].required);
        assert!(!mapping.output_fields[0].required);

        let endpoint = &parsed.endpoints[0];
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(endpoint.operation_id.as_deref(), Some("listOrders"));
        assert_eq!(endpoint.parameters[0].location, ParameterLocation::Query);
        assert!(endpoint.parameters[0].required);
        assert_eq!(endpoint.responses["200"].description.as_deref(), Some("OK"));
        assert_eq!(endpoint.responses["default"].description.as_deref(), Some("Error"));
        assert_eq!(endpoint.tags.len(), 2);

        let flow = parsed.data_flow.as_ref().unwrap();
        assert_eq!(flow.transformation_refs, vec!["m"]);
        assert_eq!(flow.source.entity, None);

        let extras = &parsed.additional_properties;
        assert_eq!(extras["owner"], json!("team-a"));
        assert_eq!(extras["team"], json!("integration"));
        assert_eq!(extras["retries"], json!(3));
        assert_eq!(extras["ratio"], json!(0.5));
        assert_eq!(extras["dryRun"], json!(true));
        assert_eq!(extras["label"], json!("nightly"));
        assert_eq!(extras["broken"], json!("three"));
    }

    #[test]
    fn test_required_flags_follow_boolean_literals() {
        let parsed = parse(
            r#"<process name="p" type="application-integration">
<transformations><transformation id="t" type="Mapping">
  <inputFields>
    <field name="a" required="TRUE"/>
    <field name="b" required=" true "/>
    <field name="c" required="yes"/>
  </inputFields>
</transformation></transformations></process>"#,
        )
        .unwrap();
        let required: Vec<bool> = parsed.transformations[0]
            .input_fields
            .iter()
            .map(|f| f.required)
            .collect();
        assert_eq!(required, vec![false, true, false]);
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let error = parse(r#"<process type="data-integration"/>"#).unwrap_err();
        assert!(matches!(error, ParseError::MissingAttribute { ref attribute, .. } if attribute == "name"));
        assert!(error.to_string().contains("test.xml"));
    }

    #[test]
    fn test_wrong_root_is_an_error() {
        let error = parse(r#"<workflow name="p"/>"#).unwrap_err();
        assert!(matches!(error, ParseError::InvalidRoot { ref found, .. } if found == "workflow"));
    }

    #[test]
    fn test_unknown_process_type_is_an_error() {
        let error = parse(r#"<process name="p" type="batch"/>"#).unwrap_err();
        assert!(matches!(error, ParseError::UnknownProcessType { .. }));
        assert!(error.to_string().contains("batch"));
    }

    #[test]
    fn test_malformed_input_reports_position() {
        let error = parse("<process name=\"p\">\n<metadata>\n</process>").unwrap_err();
        match error {
            ParseError::Malformed { line, path, .. } => {
                assert_eq!(line, 3);
                assert_eq!(path, Path::new("test.xml"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parser_does_not_validate_references() {
        let xml = MINIMAL.replace(r#"<source connectionRef="c1""#, r#"<source connectionRef="nope""#);
        let parsed = parse(&xml).unwrap();
        assert_eq!(parsed.data_flow.unwrap().source.connection_ref, "nope");
    }

    #[tokio::test]
    async fn test_parse_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.xml");
        let error = ProcessParser::default().parse(&path).await.unwrap_err();
        assert!(matches!(error, ParseError::Io { .. }));
        assert!(error.to_string().contains("absent.xml"));
    }

    #[tokio::test]
    async fn test_parse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.xml");
        tokio::fs::write(&path, MINIMAL).await.unwrap();
        let parsed = ProcessParser::default().parse(&path).await.unwrap();
        assert_eq!(parsed.process_name, "OrderSync");
    }
}
