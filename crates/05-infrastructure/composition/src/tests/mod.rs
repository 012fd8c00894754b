mod application_tests;
