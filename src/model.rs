//! Strongly-typed model of a process definition.
//!
//! Enumerated attributes are extensible: tokens outside the known set are kept in an
//! `Other` variant so that extraction stays tolerant, while the schema stage reports them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// An enumerated attribute value with a fixed set of legal spellings.
pub trait Token: Sized {
    /// Legal spellings, in declaration order
    const KNOWN: &'static [&'static str];

    /// Map a raw attribute value onto the enumeration
    fn from_token(raw: &str) -> Self;

    fn as_str(&self) -> &str;

    fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.as_str())
    }
}

/// Declared category of an integration process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessType {
    ApplicationIntegration,
    DataIntegration,
}

impl ProcessType {
    pub const KNOWN: &'static [&'static str] = &["application-integration", "data-integration"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "application-integration" => Some(ProcessType::ApplicationIntegration),
            "data-integration" => Some(ProcessType::DataIntegration),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessType::ApplicationIntegration => "application-integration",
            ProcessType::DataIntegration => "data-integration",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    Rest,
    Soap,
    GraphQl,
    Database,
    Ftp,
    Sftp,
    File,
    MessageQueue,
    Salesforce,
    Other(String),
}

impl ConnectionType {
    /// Types addressed by URL
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ConnectionType::Rest
                | ConnectionType::Soap
                | ConnectionType::GraphQl
                | ConnectionType::Salesforce
        )
    }

    /// Types addressed by host, port and database
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            ConnectionType::Database
                | ConnectionType::Ftp
                | ConnectionType::Sftp
                | ConnectionType::MessageQueue
        )
    }
}

impl Token for ConnectionType {
    const KNOWN: &'static [&'static str] = &[
        "REST",
        "SOAP",
        "GraphQL",
        "Database",
        "FTP",
        "SFTP",
        "File",
        "MessageQueue",
        "Salesforce",
    ];

    fn from_token(raw: &str) -> Self {
        match raw.trim() {
            "REST" => ConnectionType::Rest,
            "SOAP" => ConnectionType::Soap,
            "GraphQL" => ConnectionType::GraphQl,
            "Database" => ConnectionType::Database,
            "FTP" => ConnectionType::Ftp,
            "SFTP" => ConnectionType::Sftp,
            "File" => ConnectionType::File,
            "MessageQueue" => ConnectionType::MessageQueue,
            "Salesforce" => ConnectionType::Salesforce,
            other => ConnectionType::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            ConnectionType::Rest => "REST",
            ConnectionType::Soap => "SOAP",
            ConnectionType::GraphQl => "GraphQL",
            ConnectionType::Database => "Database",
            ConnectionType::Ftp => "FTP",
            ConnectionType::Sftp => "SFTP",
            ConnectionType::File => "File",
            ConnectionType::MessageQueue => "MessageQueue",
            ConnectionType::Salesforce => "Salesforce",
            ConnectionType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthenticationType {
    None,
    Basic,
    OAuth2,
    ApiKey,
    Bearer,
    Certificate,
    Other(String),
}

impl Token for AuthenticationType {
    const KNOWN: &'static [&'static str] =
        &["None", "Basic", "OAuth2", "ApiKey", "Bearer", "Certificate"];

    fn from_token(raw: &str) -> Self {
        match raw.trim() {
            "None" => AuthenticationType::None,
            "Basic" => AuthenticationType::Basic,
            "OAuth2" => AuthenticationType::OAuth2,
            "ApiKey" => AuthenticationType::ApiKey,
            "Bearer" => AuthenticationType::Bearer,
            "Certificate" => AuthenticationType::Certificate,
            other => AuthenticationType::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            AuthenticationType::None => "None",
            AuthenticationType::Basic => "Basic",
            AuthenticationType::OAuth2 => "OAuth2",
            AuthenticationType::ApiKey => "ApiKey",
            AuthenticationType::Bearer => "Bearer",
            AuthenticationType::Certificate => "Certificate",
            AuthenticationType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformationType {
    Filter,
    Expression,
    Mapping,
    Aggregate,
    Join,
    Split,
    Lookup,
    Script,
    Other(String),
}

impl Token for TransformationType {
    const KNOWN: &'static [&'static str] = &[
        "Filter",
        "Expression",
        "Mapping",
        "Aggregate",
        "Join",
        "Split",
        "Lookup",
        "Script",
    ];

    fn from_token(raw: &str) -> Self {
        match raw.trim() {
            "Filter" => TransformationType::Filter,
            "Expression" => TransformationType::Expression,
            "Mapping" => TransformationType::Mapping,
            "Aggregate" => TransformationType::Aggregate,
            "Join" => TransformationType::Join,
            "Split" => TransformationType::Split,
            "Lookup" => TransformationType::Lookup,
            "Script" => TransformationType::Script,
            other => TransformationType::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            TransformationType::Filter => "Filter",
            TransformationType::Expression => "Expression",
            TransformationType::Mapping => "Mapping",
            TransformationType::Aggregate => "Aggregate",
            TransformationType::Join => "Join",
            TransformationType::Split => "Split",
            TransformationType::Lookup => "Lookup",
            TransformationType::Script => "Script",
            TransformationType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl Token for HttpMethod {
    const KNOWN: &'static [&'static str] =
        &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

    fn from_token(raw: &str) -> Self {
        match raw.trim() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Body,
    Other(String),
}

impl Token for ParameterLocation {
    const KNOWN: &'static [&'static str] = &["query", "path", "header", "body"];

    fn from_token(raw: &str) -> Self {
        match raw.trim() {
            "query" => ParameterLocation::Query,
            "path" => ParameterLocation::Path,
            "header" => ParameterLocation::Header,
            "body" => ParameterLocation::Body,
            other => ParameterLocation::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::Body => "body",
            ParameterLocation::Other(raw) => raw,
        }
    }
}

/// How to reach a connection's system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: Option<String>,
    pub connection_type: ConnectionType,
    pub endpoint: EndpointInfo,
    pub authentication: Option<AuthenticationType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    pub name: Option<String>,
    pub transformation_type: TransformationType,
    pub description: Option<String>,
    pub expression: Option<String>,
    pub input_fields: Vec<Field>,
    pub output_fields: Vec<Field>,
}

/// One end of a data flow: a connection reference and an entity on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEndpoint {
    pub connection_ref: String,
    pub entity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlow {
    pub source: FlowEndpoint,
    pub target: FlowEndpoint,
    /// Processing chain, in declaration order
    pub transformation_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub param_type: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenApiEndpoint {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub connection_ref: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    /// Keyed by status code
    pub responses: BTreeMap<String, Response>,
    pub tags: BTreeSet<String>,
}

/// Root of the domain model, produced once per successful parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    pub process_name: String,
    pub process_type: ProcessType,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub created_date: Option<String>,
    pub modified_date: Option<String>,
    pub connections: Vec<Connection>,
    pub transformations: Vec<Transformation>,
    pub endpoints: Vec<OpenApiEndpoint>,
    pub data_flow: Option<DataFlow>,
    /// Schema-agnostic extras: unknown root attributes, unknown metadata children and
    /// `<properties>` entries
    pub additional_properties: BTreeMap<String, serde_json::Value>,
}

impl ParsedMetadata {
    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn transformation(&self, id: &str) -> Option<&Transformation> {
        self.transformations.iter().find(|t| t.id == id)
    }
}
