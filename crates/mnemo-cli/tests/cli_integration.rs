use mnemo_testing::TestWorld;

#[test]
fn extract_then_stats_reports_new_node() {
    let world = TestWorld::new();
    let sample = world
        .write_file("transcript.txt", mnemo_testing::fixtures::sample_conversation_text())
        .expect("failed to write sample transcript");

    let extract = world
        .run(&["graph", "extract", sample.to_str().unwrap(), "--platform", "chatgpt"])
        .expect("failed to run extract");
    assert!(extract.success(), "extract failed: {}", extract.stderr);

    let stats = world.run(&["graph", "stats"]).expect("failed to run stats");
    assert!(stats.success(), "stats failed: {}", stats.stderr);
    assert!(stats.stdout.contains("nodeCount") || stats.stdout.contains("node_count"));
}

#[test]
fn connector_send_then_job_list_round_trips() {
    let world = TestWorld::new();

    let add = world
        .run(&[
            "connector",
            "add",
            "primary",
            "Primary webhook",
            "https://hooks.example.com/primary",
        ])
        .expect("failed to add connector");
    assert!(add.success(), "connector add failed: {}", add.stderr);

    let send = world
        .run(&["connector", "send", "primary", "{\"hello\":\"world\"}"])
        .expect("failed to send connector job");
    assert!(send.success(), "connector send failed: {}", send.stderr);

    let jobs = world.run(&["job", "list"]).expect("failed to list jobs");
    assert!(jobs.success(), "job list failed: {}", jobs.stderr);
    assert!(jobs.stdout.contains("primary"));
}

#[test]
fn connector_send_against_unknown_id_fails() {
    let world = TestWorld::new();

    let send = world
        .run(&["connector", "send", "ghost", "{}"])
        .expect("failed to run connector send");
    assert!(!send.success());
    assert!(send.stderr.contains("no_connector"));
}

#[test]
fn sync_demo_runs_to_completion() {
    let world = TestWorld::new();
    let demo = world.run(&["sync", "demo"]).expect("failed to run sync demo");
    assert!(demo.success(), "sync demo failed: {}", demo.stderr);
    assert!(demo.stdout.contains("leader"));
}
