mod test_scenarios;
