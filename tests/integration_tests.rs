// Main integration test file that includes all test modules

mod integration {
    pub mod parser_tests;
    pub mod resolver_tests;
    pub mod search_tests;
    pub mod storage_tests;
    pub mod workflow_tests;
}

mod helpers {
    pub mod test_harness;
}
