use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use serde_json::Value;

fn formkit(store: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("formkit").expect("binary");
    cmd.env("FORMKIT_STORE_DIR", store.path())
        .env("FORMKIT_OWNER", "tester")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_line(output: &[u8]) -> String {
    String::from_utf8_lossy(output).trim().to_string()
}

fn create_form(store: &TempDir, title: &str) -> String {
    let output = formkit(store)
        .args(["new", "--title", title])
        .output()
        .expect("run new");
    assert!(output.status.success());
    stdout_line(&output.stdout)
}

fn add_field(store: &TempDir, form: &str, args: &[&str]) -> String {
    let output = formkit(store)
        .args(["field", form, "add"])
        .args(args)
        .output()
        .expect("run field add");
    assert!(output.status.success(), "{:?}", output);
    stdout_line(&output.stdout)
}

fn stored_document(store: &TempDir, form: &str) -> Value {
    let path = store.path().join("forms").join(format!("{}.json", form));
    let contents = fs::read_to_string(path).expect("form file");
    let stored: Value = serde_json::from_str(&contents).expect("form json");
    stored["document"].clone()
}

#[test]
fn new_field_and_show_round_trip() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Contact");
    let name = add_field(&store, &form, &["short_text", "--label", "Name", "--required"]);
    add_field(
        &store,
        &form,
        &["single-choice", "--label", "Topic", "--option", "Sales", "--option", "Support"],
    );

    let document = stored_document(&store, &form);
    assert_eq!(document["title"], "Contact");
    assert_eq!(document["fields"][0]["id"], name.as_str());
    assert_eq!(document["fields"][0]["required"], true);
    assert_eq!(document["fields"][1]["type"], "single_choice");
    assert_eq!(document["fields"][1]["options"][1], "Support");

    let output = formkit(&store)
        .args(["show", form.as_str()])
        .output()
        .expect("run show");
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(listing.contains("Form: Contact"));
    assert!(listing.contains("\"Name\" *"));
    assert!(listing.contains("options: Sales, Support"));

    let output = formkit(&store)
        .arg("list")
        .output()
        .expect("run list");
    assert!(String::from_utf8_lossy(&output.stdout).contains(&form));
}

#[test]
fn move_and_remove_report_bad_targets() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Order");
    add_field(&store, &form, &["email"]);
    add_field(&store, &form, &["phone"]);

    formkit(&store)
        .args(["field", form.as_str(), "move", "0", "9"])
        .assert()
        .failure();
    formkit(&store)
        .args(["field", form.as_str(), "remove", "missing"])
        .assert()
        .failure();
    formkit(&store)
        .args(["field", form.as_str(), "move", "1", "0"])
        .assert()
        .success();

    let document = stored_document(&store, &form);
    assert_eq!(document["fields"][0]["type"], "phone");
    assert_eq!(document["fields"][1]["type"], "email");
}

#[test]
fn fill_guided_reprompts_until_valid() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Signup");
    let name = add_field(&store, &form, &["short_text", "--label", "Name", "--required"]);
    add_field(&store, &form, &["email", "--label", "Email"]);

    let assert = formkit(&store)
        .args(["fill", form.as_str(), "--no-intro", "--answers-json"])
        .write_stdin("\nAda\nnope\nada@example.com\n")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stdout.contains("1/2 Name *"));
    assert!(stdout.contains("Done"));
    assert!(stdout.contains("ada@example.com"));
    assert!(stderr.contains("This field is mandatory."));

    let output = formkit(&store)
        .args(["responses", form.as_str()])
        .output()
        .expect("run responses");
    let lines: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response json"))
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["answers"][name.as_str()], "Ada");
}

#[test]
fn fill_exit_aborts_without_response() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Survey");
    add_field(&store, &form, &["long_text", "--required"]);

    formkit(&store)
        .args(["fill", form.as_str(), "--no-intro"])
        .write_stdin("exit\n")
        .assert()
        .failure();
    assert!(!store.path().join("responses").join(&form).exists());
}

#[test]
fn validate_reports_missing_answers() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Check");
    let name = add_field(&store, &form, &["short_text", "--required"]);
    let answers = store.path().join("answers.json");

    fs::write(&answers, "{}").expect("write answers");
    let output = formkit(&store)
        .args(["validate", form.as_str(), "--answers"])
        .arg(&answers)
        .output()
        .expect("run validate");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains(&format!("Missing required answers: {}", name)));

    fs::write(&answers, format!("{{\"{}\": \"Ada\"}}", name)).expect("write answers");
    formkit(&store)
        .args(["validate", form.as_str(), "--answers"])
        .arg(&answers)
        .assert()
        .success();
}

#[test]
fn validate_checks_numeric_answers_by_format() {
    let store = TempDir::new().expect("temp dir");
    let form = create_form(&store, "Numbers");
    let age = add_field(&store, &form, &["number", "--required"]);
    let email = add_field(&store, &form, &["email"]);
    let answers = store.path().join("answers.json");

    fs::write(&answers, format!("{{\"{}\": 42, \"{}\": 7}}", age, email))
        .expect("write answers");
    let output = formkit(&store)
        .args(["validate", form.as_str(), "--answers"])
        .arg(&answers)
        .output()
        .expect("run validate");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains(&format!("  {} - ", email)));
    assert!(!stdout.contains(&format!("  {} - ", age)));
    assert!(!stdout.contains("Missing required answers"));
}

#[test]
fn schema_describes_fields() {
    let store = TempDir::new().expect("temp dir");
    let output = formkit(&store).arg("schema").output().expect("run schema");
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).expect("schema json");
    assert!(schema.to_string().contains("fields"));
}
