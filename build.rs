use chrono::Utc;
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=public");

    set_build_metadata();

    let Some(target_dir) = target_profile_dir() else {
        println!("cargo:warning=无法定位构建输出目录，跳过部署文件复制");
        return Ok(());
    };

    // 前端静态文件
    if Path::new("public").exists() {
        copy_dir_all("public", target_dir.join("public"))?;
    }

    // 运行时目录
    for dir in ["uploads", "downloads", "logs"] {
        fs::create_dir_all(target_dir.join(dir))?;
    }

    Ok(())
}

/// target/<profile>，即可执行文件所在目录
fn target_profile_dir() -> Option<PathBuf> {
    let out_dir = std::env::var("OUT_DIR").ok()?;
    Path::new(&out_dir)
        .ancestors()
        .nth(3)
        .map(Path::to_path_buf)
}

fn set_build_metadata() {
    let git_commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let build_version = fs::read_to_string("VERSION")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| git_commit.clone());

    println!("cargo:rustc-env=APP_BUILD_VERSION={}", build_version);
    println!("cargo:rustc-env=APP_BUILD_COMMIT={}", git_commit);
    println!("cargo:rustc-env=APP_BUILD_TIMESTAMP={}", Utc::now().to_rfc3339());
}

fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir_all(entry.path(), dst.join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}
