mod bridge_tests;
mod poll_cycle_tests;
