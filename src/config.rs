//! Typed creation parameters
//!
//! Each struct mirrors one group of client library creation options. They
//! can be built directly with the `with_*` methods or populated from an
//! [`OptionMap`] through the tables in [`crate::params`]:
//!
//! ```rust
//! use oracledb::config::{CommonCreateParams, ConnCreateParams};
//! use oracledb::params::options;
//! use oracledb::Purity;
//!
//! let opts = options([("stmt_cache_size", 40.into()), ("purity", "self".into())]);
//! let (common, conn) = ConnCreateParams::with_common_from_options(&opts).unwrap();
//! assert_eq!(common.stmt_cache_size, 40);
//! assert_eq!(conn.purity, Purity::SelfPurity);
//! ```

use std::fmt;

use crate::constants::{
    AuthMode, CreateMode, GroupingClass, GroupingType, OpCode, PoolGetMode, Purity, SubscrNamespace,
    SubscrProtocol, SubscrQos,
};
use crate::error::{Error, Result};
use crate::params::{apply_options, param, OptionMap, ParamDef, ParamTable, ParamTarget, ParamValue};
use crate::subscription::SubscrCallback;

/// Default statement cache size
pub const DEFAULT_STMT_CACHE_SIZE: u32 = 20;

/// Default pool ping interval in seconds
pub const DEFAULT_PING_INTERVAL: i32 = 60;

/// Default pool ping timeout in milliseconds
pub const DEFAULT_PING_TIMEOUT: i32 = 5000;

fn from_options<T: ParamTable + Default>(options: &OptionMap) -> Result<T> {
    let mut params = T::default();
    apply_options(options, &mut [&mut params as &mut dyn ParamTarget])?;
    Ok(params)
}

// =============================================================================
// Context
// =============================================================================

/// Options for initializing the client library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextCreateParams {
    /// Driver name reported to the database when none is set per connection
    pub default_driver_name: Option<String>,
    /// URL shown when the client library cannot be loaded
    pub load_error_url: Option<String>,
    /// Directory holding the client library
    pub oracle_client_lib_dir: Option<String>,
    /// Directory holding network configuration files
    pub oracle_client_config_dir: Option<String>,
}

impl ParamTable for ContextCreateParams {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(ContextCreateParams, "default_driver_name", Str, default_driver_name),
        param!(ContextCreateParams, "load_error_url", Str, load_error_url),
        param!(ContextCreateParams, "oracle_client_lib_dir", Str, oracle_client_lib_dir),
        param!(ContextCreateParams, "oracle_client_config_dir", Str, oracle_client_config_dir),
    ];
}

impl ContextCreateParams {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Set the default driver name
    pub fn with_default_driver_name(mut self, name: impl Into<String>) -> Self {
        self.default_driver_name = Some(name.into());
        self
    }

    /// Set the client library directory
    pub fn with_oracle_client_lib_dir(mut self, dir: impl Into<String>) -> Self {
        self.oracle_client_lib_dir = Some(dir.into());
        self
    }

    /// Set the network configuration directory
    pub fn with_oracle_client_config_dir(mut self, dir: impl Into<String>) -> Self {
        self.oracle_client_config_dir = Some(dir.into());
        self
    }
}

// =============================================================================
// Common (connections and pools)
// =============================================================================

/// Options shared by standalone connections and pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonCreateParams {
    /// Creation mode flags
    pub create_mode: CreateMode,
    /// Edition for edition-based redefinition
    pub edition: Option<String>,
    /// Driver name reported to the database
    pub driver_name: Option<String>,
    /// Whether SODA metadata is cached
    pub soda_metadata_cache: bool,
    /// Statement cache size
    pub stmt_cache_size: u32,
}

impl Default for CommonCreateParams {
    fn default() -> Self {
        Self {
            create_mode: CreateMode::DEFAULT,
            edition: None,
            driver_name: None,
            soda_metadata_cache: false,
            stmt_cache_size: DEFAULT_STMT_CACHE_SIZE,
        }
    }
}

impl ParamTable for CommonCreateParams {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(CommonCreateParams, "create_mode", Flags, create_mode),
        param!(CommonCreateParams, "edition", Str, edition),
        param!(CommonCreateParams, "driver_name", Str, driver_name),
        param!(CommonCreateParams, "soda_metadata_cache", Bool, soda_metadata_cache),
        param!(CommonCreateParams, "stmt_cache_size", U32, stmt_cache_size),
    ];
}

impl CommonCreateParams {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Set the creation mode
    pub fn with_create_mode(mut self, mode: CreateMode) -> Self {
        self.create_mode = mode;
        self
    }

    /// Set the edition
    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = Some(edition.into());
        self
    }

    /// Set the driver name
    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = Some(name.into());
        self
    }

    /// Set the statement cache size
    pub fn with_stmt_cache_size(mut self, size: u32) -> Self {
        self.stmt_cache_size = size;
        self
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Options for a standalone connection or a pool acquire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnCreateParams {
    /// Privilege flags
    pub auth_mode: AuthMode,
    /// Connection class for session pooling
    pub connection_class: Option<String>,
    /// Session purity
    pub purity: Purity,
    /// New password, changed during connect
    pub new_password: Option<String>,
    /// Use external authentication
    pub external_auth: bool,
    /// Session tag requested from a pool
    pub tag: Option<String>,
    /// Accept any tagged session when no exact match exists
    pub match_any_tag: bool,
}

impl ParamTable for ConnCreateParams {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(ConnCreateParams, "auth_mode", Flags, auth_mode),
        param!(ConnCreateParams, "connection_class", Str, connection_class),
        param!(ConnCreateParams, "purity", Enum, purity),
        param!(ConnCreateParams, "new_password", Str, new_password),
        param!(ConnCreateParams, "external_auth", Bool, external_auth),
        param!(ConnCreateParams, "tag", Str, tag),
        param!(ConnCreateParams, "match_any_tag", Bool, match_any_tag),
    ];
}

impl ConnCreateParams {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Populate common and connection options from one map.
    ///
    /// A key is known if either table has it.
    pub fn with_common_from_options(options: &OptionMap) -> Result<(CommonCreateParams, Self)> {
        let mut common = CommonCreateParams::default();
        let mut conn = Self::default();
        apply_options(
            options,
            &mut [&mut common as &mut dyn ParamTarget, &mut conn as &mut dyn ParamTarget],
        )?;
        Ok((common, conn))
    }

    /// Set the privilege flags
    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Set the connection class
    pub fn with_connection_class(mut self, class: impl Into<String>) -> Self {
        self.connection_class = Some(class.into());
        self
    }

    /// Set the session purity
    pub fn with_purity(mut self, purity: Purity) -> Self {
        self.purity = purity;
        self
    }

    /// Request a tagged session
    pub fn with_tag(mut self, tag: impl Into<String>, match_any: bool) -> Self {
        self.tag = Some(tag.into());
        self.match_any_tag = match_any;
        self
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Options for creating a session pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCreateParams {
    /// Sessions opened at creation
    pub min_sessions: u32,
    /// Upper bound on open sessions
    pub max_sessions: u32,
    /// Sessions opened when the pool grows
    pub session_increment: u32,
    /// Seconds idle before a session is pinged on acquire; negative disables
    pub ping_interval: i32,
    /// Milliseconds to wait for a ping
    pub ping_timeout: i32,
    /// All sessions use the same credentials
    pub homogeneous: bool,
    /// Use external authentication
    pub external_auth: bool,
    /// Behaviour when no session is free
    pub get_mode: PoolGetMode,
    /// Seconds before idle sessions are closed
    pub timeout: u32,
    /// Milliseconds to wait in timed-wait mode
    pub wait_timeout: u32,
    /// Seconds a session may live
    pub max_lifetime_session: u32,
    /// PL/SQL procedure fixing up sessions with a mismatched tag
    pub plsql_fixup_callback: Option<String>,
    /// Per-shard session limit
    pub max_sessions_per_shard: u32,
}

impl Default for PoolCreateParams {
    fn default() -> Self {
        Self {
            min_sessions: 1,
            max_sessions: 1,
            session_increment: 0,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            homogeneous: true,
            external_auth: false,
            get_mode: PoolGetMode::Wait,
            timeout: 0,
            wait_timeout: 0,
            max_lifetime_session: 0,
            plsql_fixup_callback: None,
            max_sessions_per_shard: 0,
        }
    }
}

impl ParamTable for PoolCreateParams {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(PoolCreateParams, "min_sessions", U32, min_sessions),
        param!(PoolCreateParams, "max_sessions", U32, max_sessions),
        param!(PoolCreateParams, "session_increment", U32, session_increment),
        param!(PoolCreateParams, "ping_interval", I32, ping_interval),
        param!(PoolCreateParams, "ping_timeout", I32, ping_timeout),
        param!(PoolCreateParams, "homogeneous", Bool, homogeneous),
        param!(PoolCreateParams, "external_auth", Bool, external_auth),
        param!(PoolCreateParams, "get_mode", Enum, get_mode),
        param!(PoolCreateParams, "timeout", U32, timeout),
        param!(PoolCreateParams, "wait_timeout", U32, wait_timeout),
        param!(PoolCreateParams, "max_lifetime_session", U32, max_lifetime_session),
        param!(PoolCreateParams, "plsql_fixup_callback", Str, plsql_fixup_callback),
        param!(PoolCreateParams, "max_sessions_per_shard", U32, max_sessions_per_shard),
    ];
}

impl PoolCreateParams {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Populate common and pool options from one map
    pub fn with_common_from_options(options: &OptionMap) -> Result<(CommonCreateParams, Self)> {
        let mut common = CommonCreateParams::default();
        let mut pool = Self::default();
        apply_options(
            options,
            &mut [&mut common as &mut dyn ParamTarget, &mut pool as &mut dyn ParamTarget],
        )?;
        Ok((common, pool))
    }

    /// Set the session bounds and growth step
    pub fn with_sessions(mut self, min: u32, max: u32, increment: u32) -> Self {
        self.min_sessions = min;
        self.max_sessions = max;
        self.session_increment = increment;
        self
    }

    /// Set the acquire behaviour
    pub fn with_get_mode(mut self, mode: PoolGetMode) -> Self {
        self.get_mode = mode;
        self
    }

    /// Set the ping interval in seconds
    pub fn with_ping_interval(mut self, seconds: i32) -> Self {
        self.ping_interval = seconds;
        self
    }

    /// Set whether all sessions share credentials
    pub fn with_homogeneous(mut self, homogeneous: bool) -> Self {
        self.homogeneous = homogeneous;
        self
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Options for registering a subscription
#[derive(Clone, Default)]
pub struct SubscrCreateParams {
    /// Namespace
    pub subscr_namespace: SubscrNamespace,
    /// Delivery protocol
    pub protocol: SubscrProtocol,
    /// Quality-of-service flags
    pub qos: SubscrQos,
    /// Operations of interest
    pub operations: OpCode,
    /// Listening port; zero picks one
    pub port_number: u32,
    /// Seconds before the registration expires; zero never expires
    pub timeout: u32,
    /// Registration name
    pub name: Option<String>,
    /// Callback invoked for every notification
    pub callback: Option<SubscrCallback>,
    /// Recipient for mail or HTTP delivery
    pub recipient_name: Option<String>,
    /// Listening address
    pub ip_address: Option<String>,
    /// Grouping class
    pub grouping_class: GroupingClass,
    /// Grouping interval
    pub grouping_value: u32,
    /// Grouping type
    pub grouping_type: GroupingType,
    /// Registration id requested from the server
    pub out_reg_id: u64,
    /// Client-initiated connection for notifications
    pub client_initiated: bool,
}

fn set_callback(params: &mut SubscrCreateParams, name: &str, value: &ParamValue) -> Result<()> {
    params.callback = match value {
        ParamValue::Null => None,
        ParamValue::Callback(callback) => Some(callback.clone()),
        _ => {
            return Err(Error::invalid_option(
                name,
                "wrong callback type (expected nil or callback)",
            ))
        }
    };
    Ok(())
}

impl ParamTable for SubscrCreateParams {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(SubscrCreateParams, "subscr_namespace", Enum, subscr_namespace),
        param!(SubscrCreateParams, "protocol", Enum, protocol),
        param!(SubscrCreateParams, "qos", Flags, qos),
        param!(SubscrCreateParams, "operations", Flags, operations),
        param!(SubscrCreateParams, "port_number", U32, port_number),
        param!(SubscrCreateParams, "timeout", U32, timeout),
        param!(SubscrCreateParams, "name", Str, name),
        param!(SubscrCreateParams, "callback", Special, set_callback),
        param!(SubscrCreateParams, "recipient_name", Str, recipient_name),
        param!(SubscrCreateParams, "ip_address", Str, ip_address),
        param!(SubscrCreateParams, "grouping_class", Enum, grouping_class),
        param!(SubscrCreateParams, "grouping_value", U32, grouping_value),
        param!(SubscrCreateParams, "grouping_type", Enum, grouping_type),
        param!(SubscrCreateParams, "out_reg_id", U64, out_reg_id),
        param!(SubscrCreateParams, "client_initiated", Bool, client_initiated),
    ];
}

impl SubscrCreateParams {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: SubscrNamespace) -> Self {
        self.subscr_namespace = namespace;
        self
    }

    /// Set the quality-of-service flags
    pub fn with_qos(mut self, qos: SubscrQos) -> Self {
        self.qos = qos;
        self
    }

    /// Set the operations of interest
    pub fn with_operations(mut self, operations: OpCode) -> Self {
        self.operations = operations;
        self
    }

    /// Set the registration name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the notification callback
    pub fn with_callback(mut self, callback: SubscrCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl fmt::Debug for SubscrCreateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscrCreateParams")
            .field("subscr_namespace", &self.subscr_namespace)
            .field("protocol", &self.protocol)
            .field("qos", &self.qos)
            .field("operations", &self.operations)
            .field("port_number", &self.port_number)
            .field("timeout", &self.timeout)
            .field("name", &self.name)
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .field("recipient_name", &self.recipient_name)
            .field("ip_address", &self.ip_address)
            .field("grouping_class", &self.grouping_class)
            .field("grouping_value", &self.grouping_value)
            .field("grouping_type", &self.grouping_type)
            .field("out_reg_id", &self.out_reg_id)
            .field("client_initiated", &self.client_initiated)
            .finish()
    }
}

// =============================================================================
// SODA operation options
// =============================================================================

/// Options narrowing a SODA operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SodaOperOptions {
    /// Document keys
    pub keys: Vec<String>,
    /// Single document key
    pub key: Option<String>,
    /// Document version
    pub version: Option<String>,
    /// Query-by-example filter
    pub filter: Option<String>,
    /// Documents to skip
    pub skip: u32,
    /// Maximum documents returned
    pub limit: u32,
    /// Documents fetched per round trip
    pub fetch_array_size: u32,
    /// SQL hint
    pub hint: Option<String>,
}

fn set_keys(options: &mut SodaOperOptions, name: &str, value: &ParamValue) -> Result<()> {
    options.keys = match value {
        ParamValue::Null => Vec::new(),
        ParamValue::List(keys) => keys.clone(),
        ParamValue::Str(key) => vec![key.clone()],
        _ => return Err(Error::invalid_option(name, "expected list of strings")),
    };
    Ok(())
}

impl ParamTable for SodaOperOptions {
    const TABLE: &'static [ParamDef<Self>] = &[
        param!(SodaOperOptions, "keys", Special, set_keys),
        param!(SodaOperOptions, "key", Str, key),
        param!(SodaOperOptions, "version", Str, version),
        param!(SodaOperOptions, "filter", Str, filter),
        param!(SodaOperOptions, "skip", U32, skip),
        param!(SodaOperOptions, "limit", U32, limit),
        param!(SodaOperOptions, "fetch_array_size", U32, fetch_array_size),
        param!(SodaOperOptions, "hint", Str, hint),
    ];
}

impl SodaOperOptions {
    /// Populate from an option map
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        from_options(options)
    }

    /// Restrict to these keys
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the query-by-example filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set skip and limit
    pub fn with_window(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::options;
    use crate::subscription::SubscrMessage;
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let common = CommonCreateParams::default();
        assert_eq!(common.stmt_cache_size, DEFAULT_STMT_CACHE_SIZE);
        let pool = PoolCreateParams::default();
        assert_eq!((pool.min_sessions, pool.max_sessions), (1, 1));
        assert_eq!(pool.ping_interval, 60);
        assert!(pool.homogeneous);
    }

    #[test]
    fn test_pool_options() {
        let opts = options([
            ("min_sessions", 2.into()),
            ("max_sessions", 8.into()),
            ("get_mode", "timedwait".into()),
            ("edition", "E1".into()),
            ("create_mode", vec!["threaded", "events"].into()),
        ]);
        let (common, pool) = PoolCreateParams::with_common_from_options(&opts).unwrap();
        assert_eq!(pool.min_sessions, 2);
        assert_eq!(pool.max_sessions, 8);
        assert_eq!(pool.get_mode, PoolGetMode::TimedWait);
        assert_eq!(common.edition.as_deref(), Some("E1"));
        assert!(common.create_mode.contains(CreateMode::EVENTS));
    }

    #[test]
    fn test_conn_keys_unknown_to_pool() {
        let opts = options([("purity", "new".into())]);
        let err = PoolCreateParams::with_common_from_options(&opts).unwrap_err();
        assert_eq!(err.to_string(), "unknown keyword: purity");
    }

    #[test]
    fn test_subscr_callback_option() {
        let callback: SubscrCallback = Arc::new(|_msg: &SubscrMessage| -> Result<()> { Ok(()) });
        let params = SubscrCreateParams::from_options(&options([
            ("callback", callback.into()),
            ("qos", "rowids".into()),
            ("out_reg_id", 42.into()),
        ]))
        .unwrap();
        assert!(params.callback.is_some());
        assert_eq!(params.qos, SubscrQos::ROWIDS);
        assert_eq!(params.out_reg_id, 42);

        let cleared = SubscrCreateParams::from_options(&options([("callback", ParamValue::Null)])).unwrap();
        assert!(cleared.callback.is_none());

        let err = SubscrCreateParams::from_options(&options([("callback", 1.into())])).unwrap_err();
        assert!(err.to_string().contains("wrong callback type"));
    }

    #[test]
    fn test_soda_keys() {
        let opts = SodaOperOptions::from_options(&options([
            ("keys", vec!["k1", "k2"].into()),
            ("limit", 10.into()),
        ]))
        .unwrap();
        assert_eq!(opts.keys, vec!["k1", "k2"]);
        assert_eq!(opts.limit, 10);

        assert!(SodaOperOptions::from_options(&options([("keys", true.into())])).is_err());
    }

    #[test]
    fn test_builders() {
        let conn = ConnCreateParams::default()
            .with_auth_mode(AuthMode::SYSDBA)
            .with_tag("t1", true);
        assert_eq!(conn.tag.as_deref(), Some("t1"));
        assert!(conn.match_any_tag);
        let pool = PoolCreateParams::default().with_sessions(1, 4, 1);
        assert_eq!(pool.max_sessions, 4);
    }
}
