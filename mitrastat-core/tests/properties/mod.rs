mod config_tests;
mod parser_roundtrip_tests;
mod rate_tests;
mod sensor_tests;
