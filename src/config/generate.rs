pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# CONVERGE CONFIGURATION
# =============================================================================
# Installs the pre-packaged detection rules and timeline templates through the
# REST API, then polls the status endpoint until nothing is left to install or
# update.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/converge/config.yml
#   3. /etc/converge/config.yml
#
# Any value may reference an environment variable with a dollar sign, the word
# env and the variable name in braces. Variables are substituted before parsing
# and an unset variable is an error.

# =============================================================================
# API
# =============================================================================
api:
  # Base URL of the server, without a trailing path
  url: http://localhost:5601
  # Per-request timeout
  timeout: 30s
  # Basic auth credentials (optional)
  # username: elastic
  # password: changeme
  # Endpoint paths (optional, these are the defaults)
  install_path: /api/detection_engine/rules/prepackaged
  status_path: /api/detection_engine/rules/prepackaged/_status

# =============================================================================
# POLLING
# =============================================================================
# After the install request is accepted, the status endpoint is queried up to
# max_attempts times, waiting `interval` between queries. Running out of
# attempts is reported as a warning, not a failure: the install may still
# finish on the server.
poll:
  max_attempts: 100
  interval: 300ms
"#
    .to_string()
}
