fn main() -> std::process::ExitCode {
    jira_timer_lib::run()
}
