//! Zabbix JSON-RPC wire types.
//!
//! Raw records mirror the API's JSON (string-encoded numbers, `key_`,
//! `parentTemplates`) and are validated into [`crate::model`] records via
//! `TryFrom`. Anything the analysis depends on that is missing or
//! malformed becomes [`ZabbixError::InvalidRecord`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ZabbixError;
use crate::model::{
    HistoryRecord, Host, HostRef, ItemStatus, ItemTag, Template, TemplateLink, TelemetryItem,
    ValueType,
};

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// API method, e.g. `host.get`.
    pub method: &'a str,
    /// Method parameters.
    pub params: &'a Value,
    /// Request id.
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    /// Create a request envelope.
    #[must_use]
    pub const fn new(method: &'a str, params: &'a Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        }
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload on failure.
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Short message.
    pub message: String,
    /// Detail, usually the useful part.
    #[serde(default)]
    pub data: Option<String>,
}

impl From<RpcError> for ZabbixError {
    fn from(error: RpcError) -> Self {
        Self::Api {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

/// Host group id as returned by `hostgroup.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHostGroup {
    /// Group identifier.
    pub groupid: String,
}

/// Template link inside `parentTemplates`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTemplateLink {
    /// Template identifier.
    pub templateid: String,
    /// Template name.
    #[serde(default)]
    pub name: String,
}

/// Host as returned by `host.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHost {
    /// Host identifier.
    pub hostid: String,
    /// Technical name.
    #[serde(default)]
    pub host: String,
    /// Visible name.
    #[serde(default)]
    pub name: String,
    /// Linked templates.
    #[serde(default, rename = "parentTemplates")]
    pub parent_templates: Vec<RawTemplateLink>,
}

/// Template as returned by `template.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTemplate {
    /// Template identifier.
    pub templateid: String,
    /// Visible name.
    #[serde(default)]
    pub name: String,
    /// Technical name, used when the visible name is empty.
    #[serde(default)]
    pub host: String,
}

/// Tag attached to an item.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTag {
    /// Tag name.
    pub tag: String,
    /// Tag value; empty when unset.
    #[serde(default)]
    pub value: String,
}

/// Host embedded in an item via `selectHosts`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItemHost {
    /// Host identifier.
    pub hostid: String,
    /// Technical name.
    #[serde(default)]
    pub host: String,
    /// Visible name.
    #[serde(default)]
    pub name: String,
}

/// Item as returned by `item.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    /// Item identifier.
    pub itemid: String,
    /// Owning host identifier.
    #[serde(default)]
    pub hostid: String,
    /// Parent template item identifier; `"0"` when not inherited.
    #[serde(default)]
    pub templateid: Option<String>,
    /// Item key.
    #[serde(default)]
    pub key_: String,
    /// Item name.
    #[serde(default)]
    pub name: String,
    /// Value type code.
    #[serde(default)]
    pub value_type: Option<String>,
    /// Status code.
    #[serde(default)]
    pub status: Option<String>,
    /// Last value.
    #[serde(default)]
    pub lastvalue: Option<String>,
    /// Last value timestamp; `"0"` when never collected.
    #[serde(default)]
    pub lastclock: Option<String>,
    /// Item tags.
    #[serde(default)]
    pub tags: Vec<RawTag>,
    /// Owning hosts.
    #[serde(default)]
    pub hosts: Vec<RawItemHost>,
}

/// History sample as returned by `history.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHistory {
    /// Item identifier.
    pub itemid: String,
    /// Unix timestamp.
    pub clock: String,
    /// Raw value.
    #[serde(default)]
    pub value: String,
}

fn invalid(entity: &str, reason: impl Into<String>) -> ZabbixError {
    ZabbixError::InvalidRecord {
        entity: entity.to_string(),
        reason: reason.into(),
    }
}

fn require_id(entity: &str, field: &str, value: &str) -> Result<(), ZabbixError> {
    if value.trim().is_empty() {
        Err(invalid(entity, format!("missing {field}")))
    } else {
        Ok(())
    }
}

/// Treat `"0"`, empty, and absent identifiers as no link.
fn link_id(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "0")
}

impl TryFrom<RawHost> for Host {
    type Error = ZabbixError;

    fn try_from(raw: RawHost) -> Result<Self, Self::Error> {
        require_id("host", "hostid", &raw.hostid)?;
        let name = if raw.name.is_empty() {
            raw.host.clone()
        } else {
            raw.name
        };
        let mut host = Self::new(raw.hostid, raw.host, name);
        host.parent_templates = raw
            .parent_templates
            .into_iter()
            .map(|t| TemplateLink::new(t.templateid, t.name))
            .collect();
        Ok(host)
    }
}

impl TryFrom<RawTemplate> for Template {
    type Error = ZabbixError;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        require_id("template", "templateid", &raw.templateid)?;
        let name = if raw.name.is_empty() { raw.host } else { raw.name };
        Ok(Self::new(raw.templateid, name))
    }
}

impl TryFrom<RawItem> for TelemetryItem {
    type Error = ZabbixError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        require_id("item", "itemid", &raw.itemid)?;
        let embedded = raw.hosts.into_iter().next();
        let hostid = if raw.hostid.is_empty() {
            embedded.as_ref().map(|h| h.hostid.clone()).unwrap_or_default()
        } else {
            raw.hostid
        };
        require_id("item", "hostid", &hostid)?;

        let value_type = match raw.value_type.as_deref() {
            None => ValueType::default(),
            Some(code) => ValueType::from_code(code).ok_or_else(|| {
                invalid("item", format!("item {} has unknown value_type {code:?}", raw.itemid))
            })?,
        };
        let status = match raw.status.as_deref() {
            None => ItemStatus::default(),
            Some(code) => ItemStatus::from_code(code).ok_or_else(|| {
                invalid("item", format!("item {} has unknown status {code:?}", raw.itemid))
            })?,
        };
        let lastclock = match raw.lastclock.as_deref() {
            None | Some("" | "0") => None,
            Some(clock) => Some(clock.trim().parse::<i64>().map_err(|_| {
                invalid("item", format!("item {} has bad lastclock {clock:?}", raw.itemid))
            })?),
        };

        let mut item = Self::new(raw.itemid, hostid, raw.key_, raw.name)
            .with_value_type(value_type)
            .with_status(status);
        item.templateid = link_id(raw.templateid);
        if let Some(clock) = lastclock {
            item.lastclock = Some(clock);
            item.lastvalue = raw.lastvalue;
        }
        item.tags = raw
            .tags
            .into_iter()
            .map(|t| {
                if t.value.is_empty() {
                    ItemTag::bare(t.tag)
                } else {
                    ItemTag::new(t.tag, t.value)
                }
            })
            .collect();
        item.host = embedded.map(|h| {
            let display = if h.name.is_empty() { h.host.clone() } else { h.name };
            HostRef::new(h.hostid, h.host, display)
        });
        Ok(item)
    }
}

impl TryFrom<RawHistory> for HistoryRecord {
    type Error = ZabbixError;

    fn try_from(raw: RawHistory) -> Result<Self, Self::Error> {
        require_id("history", "itemid", &raw.itemid)?;
        let clock = raw.clock.trim().parse::<i64>().map_err(|_| {
            invalid(
                "history",
                format!("item {} has bad clock {:?}", raw.itemid, raw.clock),
            )
        })?;
        Ok(Self::new(raw.itemid, clock, raw.value))
    }
}

/// Decode a `result` array and validate each element.
///
/// # Errors
///
/// Returns [`ZabbixError::UnexpectedResponse`] if the payload is not an
/// array of `R`, or the first conversion error.
pub fn decode_records<R, T>(value: Value) -> Result<Vec<T>, ZabbixError>
where
    R: serde::de::DeserializeOwned,
    T: TryFrom<R, Error = ZabbixError>,
{
    let raw: Vec<R> =
        serde_json::from_value(value).map_err(|e| ZabbixError::UnexpectedResponse {
            message: format!("Failed to decode result: {e}"),
        })?;
    raw.into_iter().map(T::try_from).collect()
}
