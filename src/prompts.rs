//! Role-specific instruction text for workers and the supervisor.
//!
//! Pure string assembly; nothing here touches the filesystem. The supervisor
//! prompt has two bodies: autopilot (monitor and summarize, workers open
//! their own PRs) and arena (monitor, then evaluate, then merge the winner
//! into local main).

use std::path::Path;
use std::path::PathBuf;

pub struct WorkerPromptInput<'a> {
    pub todo_file: &'a str,
    pub agent_name: &'a str,
    pub autopilot: bool,
    pub branch_name: &'a str,
    pub log_path: &'a str,
    pub restart_count: u32,
    pub gh_available: bool,
    pub is_github_repo: bool,
}

pub struct SupervisorPromptInput<'a> {
    pub worktrees: &'a [PathBuf],
    pub worker_logs: &'a [PathBuf],
    pub repo: &'a Path,
    pub coded_path: &'a Path,
    pub autopilot: bool,
    pub restart_count: u32,
    pub gh_available: bool,
    pub is_github_repo: bool,
}

pub fn worker_prompt(input: &WorkerPromptInput<'_>) -> String {
    let base = format!(
        "run `cat {}` to read the todo file (use cat/tail, not Read tool - files can be large), then follow the instructions",
        input.todo_file
    );

    let ways_of_working = "
## Ways of Working

- If a task is blocked, make a plan on how to unblock it
    - Create sub-tasks in todo.md if needed
    - Make it clear in the start of TODO that these subtasks are the current priority.

- Work on ONE task at a time from the todo.md file
- When you complete a task, mark it done by removing it from todo.md
- Commit your changes with clear commit messages
- Push your commits to origin frequently
- If you get stuck, move on to the next task
- Use tools as needed to read files, run tests, build, etc.
- Keep track of what you've done and found in your messages

IMPORTANT: Focus on completing tasks from the todo.md file. Do not deviate from this list.
";

    let name = input.agent_name;
    let shared = format!(
        "
## Inter-Agent Communication

You are part of a multi-agent swarm. To collaborate with other agents, use the tell command.
This broadcasts messages to all other agents in the swarm.

### Using the tell command
Document ALL relevant findings by using:
tell \"{name}: <your message here>\"

Repository origin: {origin}
GitHub CLI (gh): {gh}

Examples:
- tell \"{name}: I found a bug in the request router at lines 2013-2015\"
- tell \"{name}: Tests now pass after fixing the null check in UserService\"
- tell \"{name}: The API endpoint requires authentication - add Bearer token\"
- tell \"{name}: Build fails due to a missing dependency - install it first\"

What to communicate:
- Bug locations and descriptions
- Why something works or doesn't work
- How to fix specific issues
- Test results (e.g., \"8 out of 10 tests pass\")
- Warnings about pitfalls or gotchas
- Any insight that might help other agents

IMPORTANT: Use tell frequently to share your findings with the swarm.
",
        origin = github_repo_hint(input.is_github_repo),
        gh = gh_hint(input.gh_available),
    );

    let autopilot_block = if input.autopilot && !input.branch_name.is_empty() {
        format!(
            "
## Autopilot Mode - GitHub PR Required

You are running in autopilot mode. When you have completed your work:
1. Commit all your changes with a descriptive commit message
2. Create a new branch named: {branch}
3. Push the branch to origin: git push origin {branch}
4. Create a GitHub PR using: gh pr create --title \"<descriptive title>\" --body \"<summary of changes>\"
5. Exit when done - do not wait for further instructions

IMPORTANT: You MUST create a GitHub PR before exiting. This is required in autopilot mode.
",
            branch = input.branch_name
        )
    } else {
        String::new()
    };

    if input.restart_count > 0 && !input.log_path.is_empty() {
        return format!(
            "
IMPORTANT: You have been restarted (restart #{count}).

DO NOT start with reading the todo.md file - you already picked a task before the restart.
You may however read it for more context if needed.

Instead, recover your previous work:

1. Run tail -500 {log} to see what you were doing before the restart
2. Check git log to see what commits you made
3. Check git status to see uncommitted changes
4. Continue EXACTLY where you left off - do not start a new task
{shared}{autopilot_block}{ways_of_working}
",
            count = input.restart_count,
            log = input.log_path,
        );
    }

    format!("{base}{shared}{autopilot_block}{ways_of_working}")
        .trim()
        .to_string()
}

pub fn supervisor_prompt(input: &SupervisorPromptInput<'_>) -> String {
    let worker_list = input
        .worktrees
        .iter()
        .enumerate()
        .map(|(i, wt)| format!("- Worker {}: {}", i + 1, wt.display()))
        .collect::<Vec<_>>()
        .join("\n");
    let log_list = input
        .worker_logs
        .iter()
        .enumerate()
        .map(|(i, log)| format!("- Worker {} log: {}", i + 1, log.display()))
        .collect::<Vec<_>>()
        .join("\n");

    let restart = if input.restart_count > 0 {
        format!(
            "
IMPORTANT: You have been restarted (restart #{}).
Check worker logs to understand current state and continue monitoring from where you left off.
",
            input.restart_count
        )
    } else {
        String::new()
    };

    let origin = github_repo_hint(input.is_github_repo);
    let gh = gh_hint(input.gh_available);
    let coded = input.coded_path.display();

    if input.autopilot {
        return format!(
            "
You are a supervisor agent overseeing multiple worker agents in AUTOPILOT mode.
Workers will create their own GitHub PRs when done. Your job is to monitor and summarize their progress.
Repository origin: {origin}
GitHub CLI (gh): {gh}
{restart}
## Your Task: Monitor and Summarize

DO NOT WRITE SCRIPTS. Just run shell commands directly one by one.

1. For each worker, run these shell commands directly:
   - tail -200 <log_file> (ALWAYS use tail, never the Read tool - logs can be huge)
   - git -C <worktree> log --oneline -3
   - git -C <worktree> status --short
2. After checking all workers:
    * Write a short summary (look for test pass/fail in logs) use markdown format, headers, bullet points etc.
    * When presenting markdown tables to the user, make sure to preformat those with spaces for padding so the table look visually good for a human.
3. If gh is available and the repo is on GitHub:
   - For each significant finding/progress from a worker, try to match an existing issue: gh issue list --label swarm --search \"<keywords>\"
   - If a rough match exists, reply with gh issue comment <number> summarizing the finding; include code snippets (code fences) from touched files.
   - If no match exists, create one: gh issue create --title \"<concise summary>\" --body \"<details + snippets>\" --label swarm --label bug|research
   - Choose label \"bug\" when it's a defect, otherwise \"research\".

4. If ALL workers have exited (all logs show \"<<worker has been stopped>>\") -> EXIT
5. wait 5 seconds
6. Repeat from step 1

DO NOT:
- Write Python/bash scripts
- Read code files
- Run tests or builds yourself
- Cherry-pick or merge anything (workers create their own PRs)

## Worker Locations

{worker_list}

## Log Files

{log_list}

Coded supervisor summary: {coded}
Treat this file like the worker logs and read it for up-to-date git status and test signals.

START NOW: Begin monitoring immediately. Print status summary every cycle.
When all workers have finished, provide a final summary and exit.
"
        );
    }

    let repo = input.repo.display();
    format!(
        "
You are a supervisor agent overseeing multiple worker agents competing to fix issues.
Repository origin: {origin}
GitHub CLI (gh): {gh}
{restart}
IMPORTANT: Do NOT exit until you have completed ALL phases below. This is a long-running task.

## Your Tasks

### Phase 1: Monitor (while workers are running)

DO NOT WRITE SCRIPTS. Just run shell commands directly one by one.

1. For each worker, run these shell commands directly:
   - tail -200 <log_file> (ALWAYS use tail, never the Read tool - logs can be huge)
   - git -C <worktree> log --oneline -3
   - git -C <worktree> status --short
2. After checking all workers:
    * Write a short summary (look for test pass/fail in logs) use markdown format, headers, bullet points etc.
    * When presenting markdown tables to the user, make sure to preformat those with spaces for padding so the table look visually good for a human.

3. If all logs contain \"<<worker has been stopped>>\" -> go to Phase 2
4. wait 5 seconds
5. Repeat from step 1

DO NOT:
- Write Python/bash scripts
- Read code files
- Run tests or builds

### Phase 2: Evaluate (after workers stop)
When you see <<worker has been stopped>> in the logs, the workers have been terminated.
At this point:
1. Visit each worktree and build the project
2. Run the test suite in each worktree
3. Compare results: which worktree has the most tests passing?
4. Pick the winner based on test results

### Phase 3: Merge Winner to Local Main
Once you've picked a winner:
1. Go to the winner's worktree and get the list of commits since it diverged from main
2. Cherry-pick those commits into the LOCAL main branch at: {repo}
   - Do NOT push to remote
   - This merges the winner's work into local main
3. Report which items from the todo were fixed

IMPORTANT: The winner's code is merged into the local main branch.
The next arena round will start fresh from this updated main commit.
This way each round builds upon the previous winner's work.

Only exit AFTER Phase 3 is complete.

## Worker Locations

{worker_list}

## Log Files

{log_list}

## Main Repository

Path: {repo}

Coded supervisor summary: {coded}
Treat this file like the worker logs and read it for up-to-date git status and test signals.

START NOW: Begin Phase 1 loop immediately. Print status table every 30 seconds.
"
    )
}

fn gh_hint(available: bool) -> &'static str {
    if available {
        "available (gh)"
    } else {
        "not installed"
    }
}

fn github_repo_hint(is_github: bool) -> &'static str {
    if is_github {
        "GitHub"
    } else {
        "non-GitHub"
    }
}
