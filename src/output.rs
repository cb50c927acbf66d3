use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use serde_json::json;

use crate::sim::SimParams;
use crate::types::{SimulationResult, Task};
use crate::utils::prelude::*;

const BAR_WIDTH: u64 = 40;

fn table<W: Write>(mut w: W, header: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    writeln!(w, "{}", aligned(header.iter().copied(), &widths))?;
    writeln!(w, "{}", widths.iter().map(|n| "-".repeat(*n)).join("  "))?;
    for row in rows {
        writeln!(w, "{}", aligned(row.iter().map(String::as_str), &widths))?;
    }
    Ok(())
}

fn aligned<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(c, w)| format!("{:>width$}", c, width = *w))
        .join("  ")
}

/// Input tasks sorted by arrival, then the schedule, the averages, and the VM loads
pub fn render_tables<W: Write>(mut w: W, tasks: &[Task], result: &SimulationResult) -> io::Result<()> {
    writeln!(w, "Tasks")?;
    let rows: Vec<_> = tasks
        .iter()
        .sorted_by_key(|t| (t.arrival, t.id))
        .map(|t| {
            vec![
                t.id.to_string(),
                t.arrival.to_string(),
                t.burst.to_string(),
                t.priority.to_string(),
                t.deadline.to_string(),
            ]
        })
        .collect();
    table(&mut w, &["Task ID", "Arrival", "Burst", "Priority", "Deadline"], &rows)?;

    writeln!(w, "\nSchedule ({})", result.policy)?;
    let rows: Vec<_> = result
        .entries
        .iter()
        .map(|e| {
            vec![
                e.task_id.to_string(),
                e.start.to_string(),
                e.finish.to_string(),
                e.waiting.to_string(),
                e.turnaround.to_string(),
                e.vm.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    table(&mut w, &["Task ID", "Start", "Finish", "Waiting", "Turnaround", "VM"], &rows)?;

    writeln!(w, "\nPerformance Metrics")?;
    if result.has_tasks() {
        writeln!(w, "Average Waiting Time: {:.2}", result.average_waiting)?;
        writeln!(w, "Average Turnaround Time: {:.2}", result.average_turnaround)?;
    } else {
        writeln!(w, "Average Waiting Time: n/a (no tasks)")?;
        writeln!(w, "Average Turnaround Time: n/a (no tasks)")?;
    }
    writeln!(w, "Makespan: {}", result.makespan)?;
    writeln!(w, "Deadlines Missed: {} of {}", result.deadlines_missed, result.task_count)?;

    writeln!(w, "\nVM Load Distribution")?;
    let peak = result.vm_loads.iter().map(|v| v.cumulative_load).max().unwrap_or(0);
    for load in &result.vm_loads {
        let bar = if peak == 0 {
            0
        } else {
            (u128::from(load.cumulative_load) * u128::from(BAR_WIDTH) / u128::from(peak)) as usize
        };
        writeln!(
            w,
            "{:>5} {:>6} {}",
            load.vm.to_string(),
            load.cumulative_load,
            "#".repeat(bar)
        )?;
    }
    Ok(())
}

/// One row per schedule entry
pub fn write_schedule_csv(path: &Path, result: &SimulationResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in &result.entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    info!(path = %path.display(), "schedule written");
    Ok(())
}

/// The full result alongside the parameters that produced it
pub fn write_json(path: &Path, result: &SimulationResult, params: &SimParams) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        params: &'a SimParams,
        result: &'a SimulationResult,
    }

    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &Report { params, result })?;
    info!(path = %path.display(), "result written");
    Ok(())
}

fn event_line(mut writer: impl Write, val: serde_json::Value, last: bool) -> Result<()> {
    serde_json::to_writer(&mut writer, &val)?;
    let ending: &[u8] = if last { b"\n" } else { b",\n" };
    writer.write_all(ending)?;
    Ok(())
}

/// Gantt view of the single timeline in Chrome trace format, one time unit per microsecond
pub fn render_chrome_trace(path: &Path, result: &SimulationResult) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(b"{\"traceEvents\":[\n")?;

    for entry in &result.entries {
        let vm = entry.vm.map(|v| v.to_string());
        // waiting shows up on the task's own row, execution on the shared timeline
        if entry.waiting > 0 {
            event_line(
                &mut file,
                json!({
                    "name": format!("{} waiting", entry.task_id),
                    "ph": "X",
                    "cat": "waiting",
                    "ts": entry.start - entry.waiting,
                    "dur": entry.waiting,
                    "pid": 0,
                    "tid": entry.task_id.0,
                }),
                false,
            )?;
        }
        event_line(
            &mut file,
            json!({
                "name": entry.task_id.to_string(),
                "ph": "X",
                "cat": "exec",
                "ts": entry.start,
                "dur": entry.executed,
                "pid": 1,
                "tid": 0,
                "args": {
                    "waiting": entry.waiting,
                    "turnaround": entry.turnaround,
                    "vm": vm,
                }
            }),
            false,
        )?;
    }

    event_line(
        &mut file,
        json!({ "name": "process_name", "ph": "M", "pid": 0, "args": { "name": "Queue" } }),
        false,
    )?;
    event_line(
        &mut file,
        json!({ "name": "process_name", "ph": "M", "pid": 1, "args": { "name": format!("Timeline ({})", result.policy) } }),
        true,
    )?;
    file.write_all(b"]}\n")?;
    file.flush()?;

    info!(path = %path.display(), "trace written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyKind;
    use crate::sim::simulate;
    use crate::types::{TaskId, Time};
    use rand_seeder::{Seeder, SipRng};
    use std::fs;

    fn result(policy: PolicyKind) -> (Vec<Task>, SimulationResult, SimParams) {
        let tasks = vec![
            Task {
                id: TaskId(1),
                arrival: 0,
                burst: 3,
                priority: 1,
                deadline: 10,
            },
            Task {
                id: TaskId(2),
                arrival: 1,
                burst: 2,
                priority: 1,
                deadline: 4,
            },
        ];
        let params = SimParams {
            task_count: 2,
            vm_count: 2,
            policy,
            quantum: None,
        };
        let mut rng: SipRng = Seeder::from("output").make_rng();
        let res = simulate(&tasks, &params, &mut rng).unwrap();
        (tasks, res, params)
    }

    #[test]
    fn tables_contain_metrics() {
        let (tasks, res, _) = result(PolicyKind::FCFS);
        let mut buf = vec![];
        render_tables(&mut buf, &tasks, &res).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Average Waiting Time: 1.00"));
        assert!(text.contains("Average Turnaround Time: 3.50"));
        assert!(text.contains("Deadlines Missed: 1 of 2"));
        assert!(text.contains("VM1"));
        assert!(text.contains("VM2"));
    }

    #[test]
    fn empty_result_has_no_averages() {
        let params = SimParams {
            task_count: 0,
            ..Default::default()
        };
        let mut rng: SipRng = Seeder::from("output").make_rng();
        let res = simulate(&[], &params, &mut rng).unwrap();

        let mut buf = vec![];
        render_tables(&mut buf, &[], &res).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("n/a (no tasks)"));
    }

    #[test]
    fn load_bars_scale_huge_loads() {
        let (tasks, mut res, _) = result(PolicyKind::RandomLoadBalancing);
        res.vm_loads[0].cumulative_load = Time::MAX;
        res.vm_loads[1].cumulative_load = Time::MAX / 2;

        let mut buf = vec![];
        render_tables(&mut buf, &tasks, &res).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let bars: Vec<usize> = text
            .lines()
            .filter(|l| l.trim_start().starts_with("VM"))
            .map(|l| l.matches('#').count())
            .collect();
        assert_eq!(bars, vec![40, 19]);
    }

    #[test]
    fn files_parse_back() {
        let (_, res, params) = result(PolicyKind::RandomLoadBalancing);
        let dir = std::env::temp_dir().join(format!("cloudsched-output-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let trace = dir.join("trace.json");
        render_chrome_trace(&trace, &res).unwrap();
        let trace: serde_json::Value = serde_json::from_str(&fs::read_to_string(&trace).unwrap()).unwrap();
        let exec = trace["traceEvents"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["cat"] == "exec")
            .count();
        assert_eq!(exec, 2);

        let json = dir.join("result.json");
        write_json(&json, &res, &params).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(json["result"]["task_count"], 2);
        assert_eq!(json["params"]["policy"], "RandomLoadBalancing");

        let csv = dir.join("schedule.csv");
        write_schedule_csv(&csv, &res).unwrap();
        let text = fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("task_id,start,finish,executed,waiting,turnaround,vm"));
        assert_eq!(text.lines().count(), 3);

        fs::remove_dir_all(&dir).ok();
    }
}
