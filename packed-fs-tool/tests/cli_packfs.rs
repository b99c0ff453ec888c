// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    assert_cmd::Command,
    assert_fs::{prelude::*, TempDir},
    predicates::prelude::*,
};

fn get_command() -> Result<Command> {
    Ok(Command::cargo_bin("packfs")?)
}

fn populate(temp_dir: &TempDir) -> Result<()> {
    temp_dir.child("site").create_dir_all()?;
    temp_dir.child("site/css").create_dir_all()?;
    temp_dir.child("site/index.html").write_str("<html></html>")?;
    temp_dir.child("site/css/site.css").write_str("body {}")?;

    Ok(())
}

fn no_args_fails() -> Result<()> {
    get_command()?.assert().failure();

    Ok(())
}

fn pack_requires_output() -> Result<()> {
    get_command()?
        .arg("pack")
        .arg("whatever")
        .assert()
        .failure()
        .stderr(predicates::str::contains("--output"));

    Ok(())
}

fn pack_list_extract() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;

    let blob = temp_dir.child("site.bin");

    get_command()?
        .arg("pack")
        .arg(temp_dir.child("site").path())
        .arg("--output")
        .arg(blob.path())
        .arg("--prefix")
        .arg("static")
        .arg("--compress")
        .assert()
        .success();

    blob.assert(predicates::path::is_file());

    get_command()?
        .arg("list")
        .arg(blob.path())
        .assert()
        .success()
        .stdout(
            predicates::str::contains("/static/index.html")
                .and(predicates::str::contains("/static/css/site.css"))
                .and(predicates::str::contains("TOTAL ENTRIES: 5")),
        );

    let out = temp_dir.child("out");

    get_command()?
        .arg("extract")
        .arg(blob.path())
        .arg(out.path())
        .arg("--path")
        .arg("static")
        .assert()
        .success()
        .stdout(predicates::str::contains("extracted 2 files"));

    out.child("index.html").assert("<html></html>");
    out.child("css/site.css").assert("body {}");

    Ok(())
}

fn list_corrupt_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let blob = temp_dir.child("bad.bin");
    blob.write_str("not a blob")?;

    get_command()?
        .arg("list")
        .arg(blob.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("unrecognized file format"));

    Ok(())
}

fn generate_source() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;

    let source = temp_dir.child("resources.rs");

    get_command()?
        .arg("generate")
        .arg(temp_dir.child("site/index.html").path())
        .arg("--output")
        .arg(source.path())
        .arg("--function-name")
        .arg("register_site")
        .assert()
        .success();

    source.assert(
        predicates::str::contains("pub fn register_site() {")
            .and(predicates::str::contains("pub static PACKED_RESOURCES: &[u8]"))
            .and(predicates::str::contains("packed_fs::register_or_abort(")),
    );

    get_command()?
        .arg("generate")
        .arg(temp_dir.child("site").path())
        .arg("--output")
        .arg(source.path())
        .arg("--static-name")
        .arg("not valid")
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a valid Rust identifier"));

    Ok(())
}

fn run() -> Result<()> {
    no_args_fails()?;
    pack_requires_output()?;
    pack_list_extract()?;
    list_corrupt_fails()?;
    generate_source()?;

    Ok(())
}

fn main() {
    run().expect("all tests should pass");
}
