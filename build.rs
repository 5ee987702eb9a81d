use std::env;
use std::process::Command;

fn main() {
    build_ver();
}

fn build_ver() {
    let cargo_ver = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let version = git_ver().unwrap_or(format!("{} (unknown commit)", cargo_ver));

    println!("cargo:rustc-env=REOLINK_VERSION={}", version.trim());
    println!(
        "cargo:rustc-env=REOLINK_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}

fn git_ver() -> Option<String> {
    github_ver().or_else(git_cmd_ver)
}

fn git_cmd_ver() -> Option<String> {
    let mut git_cmd = Command::new("git");
    git_cmd.args(["describe", "--tags"]);

    if let Some(true) = git_cmd.status().ok().map(|exit| exit.success()) {
        println!("cargo:rerun-if-changed=.git/HEAD");
        git_cmd
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
    } else {
        None
    }
}

fn github_ver() -> Option<String> {
    if let Ok(sha1) = env::var("GITHUB_SHA") {
        println!("cargo:rerun-if-env-changed=GITHUB_SHA");
        Some(sha1)
    } else {
        None
    }
}
