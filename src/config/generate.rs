/// Starter configuration written by `config init`.
///
/// Every value matches the built-in default, so the file only serves as a
/// documented starting point.
pub fn generate_default_config() -> String {
    r#"# =============================================================================
# NEM12SQL CONFIGURATION
# =============================================================================
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/nem12sql/config.yml
#   3. /etc/nem12sql/config.yml
#
# Values may reference environment variables as $env{NAME}. Paths may start
# with ~ for the home directory.

# =============================================================================
# PIPELINE
# =============================================================================
pipeline:
  # Readings per INSERT statement (and per bulk-load block)
  batch_size: 16384
  # Expansion workers turning interval blocks into readings
  workers: 8
  # Interval blocks waiting for a worker
  interval_queue_capacity: 4096
  # Readings waiting for the batching sink
  reading_queue_capacity: 2048

# =============================================================================
# IO
# =============================================================================
io:
  read_buffer_size: 1048576
  write_buffer_size: 1048576

# =============================================================================
# OUTPUT
# =============================================================================
output:
  table: meter_readings
  # Defaults to the input path with its extension replaced by .sql
  insert_path: ~
  copy_path: meter_readings.sql.csv
"#
    .to_string()
}
