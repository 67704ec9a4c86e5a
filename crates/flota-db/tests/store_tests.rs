// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use flota_app::Document;
use flota_db::{DOCUMENT_KEY, KeyValue, PullOutcome, Seed, SqliteKv, Store};
use flota_sync::{Client, PushQueue, SyncError};
use flota_testkit::{FleetFaker, fixture_today, temp_db_path};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn start_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/exec", server.server_addr());
    Ok((server, addr))
}

fn serve_json(server: Server, body: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(body).with_status_code(200).with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        );
        request.respond(response).expect("response should succeed");
    })
}

fn client() -> Result<Client> {
    Client::new(Duration::from_secs(2))
}

#[test]
fn save_then_reopen_round_trips_document() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let document = FleetFaker::new(9).fleet(25, fixture_today())?;
    {
        let mut store = Store::open(&path, Seed::Blank)?;
        store.save(&document)?;
    }

    let mut reopened = Store::open(&path, Seed::Demo)?;
    assert_eq!(reopened.load()?, document);
    Ok(())
}

#[test]
fn load_backfills_missing_keys_and_persists_them() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let mut kv = SqliteKv::open(&path)?;
        kv.put(DOCUMENT_KEY, r#"{"vehicles":[{"id":"0007","licensePlate":"1234BCD"}]}"#)?;
    }

    let mut store = Store::open(&path, Seed::Demo)?;
    let document = store.load()?;
    assert_eq!(document.vehicles.len(), 1);
    assert_eq!(document.users, Document::blank().users);
    drop(store);

    let kv = SqliteKv::open(&path)?;
    let raw = kv.get(DOCUMENT_KEY)?.expect("document stored");
    for key in Document::TOP_LEVEL_KEYS {
        assert!(raw.contains(&format!("\"{key}\"")), "missing {key}");
    }
    Ok(())
}

#[test]
fn corrupt_document_is_actionable() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let mut kv = SqliteKv::open(&path)?;
        kv.put(DOCUMENT_KEY, "{not json")?;
    }

    let mut store = Store::open(&path, Seed::Demo)?;
    let error = store.load().expect_err("corrupt JSON should fail");
    assert!(error.to_string().contains("flota reset"));
    Ok(())
}

#[test]
fn reset_and_clear_restore_templates() -> Result<()> {
    let mut store = Store::open_memory(Seed::Blank);
    assert_eq!(store.reset()?, Document::initial());
    assert_eq!(store.load()?, Document::initial());
    assert_eq!(store.clear()?, Document::blank());
    assert_eq!(store.load()?, Document::blank());
    Ok(())
}

#[test]
fn pull_without_url_is_not_configured() -> Result<()> {
    let mut store = Store::open_memory(Seed::Demo);
    match store.pull_remote(&client()?)? {
        PullOutcome::Failed { error, local } => {
            assert_eq!(error, SyncError::NotConfigured);
            assert_eq!(local, Document::initial());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.last_sync_success()?, None);
    Ok(())
}

#[test]
fn pull_merges_remote_and_records_sync_time() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = serve_json(
        server,
        r#"{"vehicles":[{"id":"0042","licensePlate":"4242KLM","status":"Activo"}],
            "reportSettings":{"googleScriptUrl":"https://elsewhere.example.com"}}"#
            .to_owned(),
    );

    let mut store = Store::open_memory(Seed::Demo);
    let local = store.load()?.with_sync_url(&addr);
    store.save(&local)?;

    let outcome = store.pull_remote(&client()?)?;
    handle.join().expect("server thread should join");

    let (document, changed) = match outcome {
        PullOutcome::Merged { document, changed } => (document, changed),
        other => panic!("pull should merge: {other:?}"),
    };
    assert!(changed);
    assert_eq!(document.vehicles.len(), 1);
    assert_eq!(document.vehicles[0].license_plate, "4242KLM");
    assert_eq!(document.brands, local.brands);
    assert_eq!(document.report_settings.google_script_url, addr);
    assert_eq!(store.load()?, document);
    assert!(store.last_sync_success()?.is_some());
    Ok(())
}

#[test]
fn failed_pull_leaves_local_document_alone() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string("<html>Acceso denegado</html>").with_header(
            Header::from_bytes("Content-Type", "text/html").expect("valid content type header"),
        );
        request.respond(response).expect("response should succeed");
    });

    let mut store = Store::open_memory(Seed::Demo);
    let local = store.load()?.with_sync_url(&addr);
    store.save(&local)?;

    let outcome = store.pull_remote(&client()?)?;
    handle.join().expect("server thread should join");
    assert_eq!(
        outcome,
        PullOutcome::Failed {
            error: SyncError::PermissionPage,
            local: local.clone(),
        }
    );
    assert_eq!(store.load()?, local);
    assert_eq!(store.last_sync_success()?, None);
    Ok(())
}

#[test]
fn link_device_stores_url_even_when_cloud_is_empty() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = serve_json(server, "{}".to_owned());

    let mut store = Store::open_memory(Seed::Demo);
    let outcome = store.link_device(&format!("  {addr} "), &client()?)?;
    handle.join().expect("server thread should join");

    assert!(matches!(
        outcome,
        PullOutcome::Failed {
            error: SyncError::EmptyCloud,
            ..
        }
    ));
    assert_eq!(store.load()?.report_settings.sync_url(), Some(addr.as_str()));
    Ok(())
}

#[test]
fn save_with_pusher_posts_document() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("push expected");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read request body");
        request
            .respond(Response::from_string("ok"))
            .expect("response should succeed");
        body
    });

    let mut store = Store::open_memory(Seed::Demo);
    store.attach_pusher(PushQueue::spawn(client()?, None));
    let document = store.load()?.with_sync_url(&addr);
    store.save(&document)?;
    if let Some(pusher) = store.detach_pusher() {
        pusher.shutdown();
    }

    let body = handle.join().expect("server thread should join");
    assert!(body.starts_with("db_data="), "{body}");
    Ok(())
}

#[test]
fn push_remote_reports_outcome_without_failing() -> Result<()> {
    let mut store = Store::open_memory(Seed::Demo);
    let document = store.load()?.with_sync_url("http://127.0.0.1:1/exec");
    store.save(&document)?;

    let result = store.push_remote(&Client::new(Duration::from_millis(200))?)?;
    assert!(matches!(result, Err(SyncError::Connection { .. })));
    assert_eq!(store.load()?, document);
    Ok(())
}
