use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{IsTerminal, Write};

use adbwire_client::{Device, DirEntry, FileStat, ForwardMap};
use adbwire_frame::{S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Raw
        }
    }
}

#[derive(Serialize)]
struct StatOutput<'a> {
    path: &'a str,
    exists: bool,
    mode: String,
    permissions: String,
    size: u32,
    mtime: u32,
}

#[derive(Serialize)]
struct EntryOutput<'a> {
    name: &'a str,
    mode: String,
    size: u32,
    mtime: u32,
}

#[derive(Serialize)]
struct ForwardOutput<'a> {
    serial: &'a str,
    local: &'a str,
    remote: &'a str,
}

#[derive(Serialize)]
struct TransferOutput<'a> {
    direction: &'a str,
    source: &'a str,
    destination: &'a str,
    bytes: u64,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_devices(devices: &[Device], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(devices),
        OutputFormat::Table => {
            let mut table = table(vec!["SERIAL", "STATE"]);
            for device in devices {
                table.add_row(vec![device.serial().to_string(), device.state().to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for device in devices {
                println!("{}\t{}", device.serial(), device.state());
            }
        }
    }
}

/// A flat list of words, one per line.
pub fn print_list(title: &str, items: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(items),
        OutputFormat::Table => {
            let mut table = table(vec![title]);
            for item in items {
                table.add_row(vec![item.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for item in items {
                println!("{item}");
            }
        }
    }
}

/// A single named value.
pub fn print_value<T: Serialize + Display>(name: &str, value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let mut map = BTreeMap::new();
            map.insert(name, value);
            print_json(&map);
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{name}: {value}"),
        OutputFormat::Raw => println!("{value}"),
    }
}

pub fn print_forwards(forwards: &ForwardMap, format: OutputFormat) {
    let rows: Vec<ForwardOutput<'_>> = forwards
        .iter()
        .flat_map(|(serial, entries)| {
            entries.iter().map(move |(local, remote)| ForwardOutput {
                serial,
                local,
                remote,
            })
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = table(vec!["SERIAL", "LOCAL", "REMOTE"]);
            for row in &rows {
                table.add_row(vec![row.serial, row.local, row.remote]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{} {} {}", row.serial, row.local, row.remote);
            }
        }
    }
}

pub fn print_stat(path: &str, stat: &FileStat, format: OutputFormat) {
    let out = StatOutput {
        path,
        exists: stat.exists(),
        mode: mode_string(stat.mode),
        permissions: format!("{:04o}", stat.permissions()),
        size: stat.size,
        mtime: stat.mtime,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["PATH", "MODE", "SIZE", "MTIME"]);
            table.add_row(vec![
                out.path.to_string(),
                out.mode.clone(),
                out.size.to_string(),
                out.mtime.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("  Path:        {}", out.path);
            println!("  Exists:      {}", out.exists);
            println!("  Mode:        {} ({})", out.mode, out.permissions);
            println!("  Size:        {}", out.size);
            println!("  Modified:    {}", out.mtime);
        }
        OutputFormat::Raw => println!("{} {} {} {}", out.mode, out.size, out.mtime, out.path),
    }
}

pub fn print_entries(entries: &[DirEntry], format: OutputFormat) {
    let rows: Vec<EntryOutput<'_>> = entries
        .iter()
        .map(|entry| EntryOutput {
            name: &entry.name,
            mode: mode_string(entry.stat.mode),
            size: entry.stat.size,
            mtime: entry.stat.mtime,
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = table(vec!["MODE", "SIZE", "MTIME", "NAME"]);
            for row in &rows {
                table.add_row(vec![
                    row.mode.clone(),
                    row.size.to_string(),
                    row.mtime.to_string(),
                    row.name.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{} {:>10} {}", row.mode, row.size, row.name);
            }
        }
        OutputFormat::Raw => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }
}

pub fn print_properties(properties: &BTreeMap<&str, &str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(properties),
        OutputFormat::Table => {
            let mut table = table(vec!["NAME", "VALUE"]);
            for (name, value) in properties {
                table.add_row(vec![*name, *value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (name, value) in properties {
                println!("[{name}]: [{value}]");
            }
        }
    }
}

pub fn print_transfer(
    direction: &str,
    source: &str,
    destination: &str,
    bytes: u64,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&TransferOutput {
            direction,
            source,
            destination,
            bytes,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{source} -> {destination}: {bytes} bytes")
        }
        OutputFormat::Raw => println!("{bytes}"),
    }
}

/// One line of shell output.
pub fn print_line(line: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(line),
        _ => {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }
}

/// `ls -l` style rendering of a mode word, e.g. `drwxr-x--x`.
pub fn mode_string(mode: u32) -> String {
    let kind = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        S_IFREG => '-',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        _ => '?',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
