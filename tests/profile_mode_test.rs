use assert_cmd::Command;
use predicates::str::contains;
use std::path::Path;
use tempfile::tempdir;

fn aegis_cmd(tmp: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aegis").expect("aegis binary");
    cmd.current_dir(tmp)
        .env("AEGIS_HOME", tmp.join("aegis-home"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_SERVICE_ROLE_KEY");
    cmd
}

#[test]
fn mode_defaults_to_private() {
    let tmp = tempdir().expect("tempdir");

    aegis_cmd(tmp.path())
        .args(["mode", "--owner", "teen-1"])
        .assert()
        .success()
        .stdout(contains("mode=PRIVATE"));
}

#[test]
fn mode_round_trips_across_invocations() {
    let tmp = tempdir().expect("tempdir");

    aegis_cmd(tmp.path())
        .args(["mode", "--owner", "teen-1", "--set", "shared"])
        .assert()
        .success()
        .stdout(contains("mode=SHARED"));

    aegis_cmd(tmp.path())
        .args(["mode", "--owner", "teen-1"])
        .assert()
        .success()
        .stdout(contains("mode=SHARED"));

    // A second owner is unaffected by the first owner's consent.
    aegis_cmd(tmp.path())
        .args(["mode", "--owner", "teen-2"])
        .assert()
        .success()
        .stdout(contains("mode=PRIVATE"));
}

#[test]
fn invalid_mode_value_is_rejected() {
    let tmp = tempdir().expect("tempdir");

    aegis_cmd(tmp.path())
        .args(["mode", "--owner", "teen-1", "--set", "public"])
        .assert()
        .failure()
        .stderr(contains("invalid mode"));
}

#[test]
fn summaries_listing_is_empty_until_a_shared_turn_produces_one() {
    let tmp = tempdir().expect("tempdir");

    aegis_cmd(tmp.path())
        .args(["summaries", "--owner", "teen-1"])
        .assert()
        .success()
        .stdout(contains("summaries=0"));
}
