//! Well-known names shared by all Cloud Pak Operations crates.

/// Name of the executable and of the built-in command distribution
pub const CLI_NAME: &str = "cpo";

/// Directory under the user's home holding all persisted state
pub const CLI_CONFIG_DIR: &str = ".cpo";

/// Overrides the data directory (used by tests and packaging)
pub const CPO_HOME_ENV: &str = "CPO_HOME";

/// Extra plug-in search paths, OS path-list separated
pub const CPO_PLUGIN_PATH_ENV: &str = "CPO_PLUGIN_PATH";

/// Log level forwarded to plug-in executables
pub const CPO_LOG_LEVEL_ENV: &str = "CPO_LOG_LEVEL";

pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const CLUSTERS_FILE_NAME: &str = "clusters.json";
pub const PLUGINS_DIR_NAME: &str = "plugins";

/// Entry-point group plug-in distributions advertise their packages in
pub const PLUGIN_ENTRY_POINT_GROUP: &str = "cpo.plugins";

// cluster data keys
pub const KEY_ALIAS: &str = "alias";
pub const KEY_TYPE: &str = "type";
pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_TOKEN: &str = "token";
pub const KEY_INSECURE_SKIP_TLS_VERIFY: &str = "insecure_skip_tls_verify";
pub const KEY_CLUSTER_NAME: &str = "cluster_name";
pub const KEY_SERVER: &str = "server";

// user credential keys
pub const KEY_IBM_CP_ENTITLEMENT_KEY: &str = "ibm_cp_entitlement_key";
pub const KEY_IBM_CLOUD_API_KEY: &str = "ibm_cloud_api_key";

// settings keys
pub const SETTING_LOG_LEVEL: &str = "log_level";
pub const SETTING_WATCH_TIMEOUT_SECONDS: &str = "watch_timeout_seconds";

// OAuth
pub const OAUTH_DISCOVERY_PATH: &str = "/.well-known/oauth-authorization-server";
pub const OAUTH_CHALLENGING_CLIENT_ID: &str = "openshift-challenging-client";

// OpenShift
pub const GLOBAL_PULL_SECRET_NAMESPACE: &str = "openshift-config";
pub const GLOBAL_PULL_SECRET_NAME: &str = "pull-secret";
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";
pub const OPENSHIFT_APISERVER_OPERATOR: &str = "openshift-apiserver";
pub const OPENSHIFT_MARKETPLACE_NAMESPACE: &str = "openshift-marketplace";

// Cloud Pak for Data
pub const IBM_ENTITLED_REGISTRY: &str = "cp.icr.io";
pub const IBM_ENTITLED_REGISTRY_USERNAME: &str = "cp";
pub const FOUNDATIONAL_SERVICES_PROJECT: &str = "ibm-common-services";
pub const DEFAULT_INSTANCE_PROJECT: &str = "cpd-instance";
pub const COMPLETED_STATUS: &str = "Completed";
