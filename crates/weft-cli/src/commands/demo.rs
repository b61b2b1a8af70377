//! The built-in demo workflow.
//!
//! A small data-entry flow: greet the user, offer a command menu, and
//! branch into an option sub-machine, a mock file-processing state, and a
//! report state. Exercises input requests, carry payloads, sub-machine
//! composition, and parent transitions.

use anyhow::Result;
use serde_json::json;
use weft::{
    ConsoleHost, Driver, Engine, Instruction, Machine, Routine, RoutineInput, RoutineRegistry,
    Step, script,
};
use weft_config::ConfigLoader;

pub fn run(debug: bool) -> Result<()> {
    let config = ConfigLoader::new().load_or_default();

    let mut engine = Engine::new(demo_machine()?, demo_registry())?;
    let mut driver = Driver::new(ConsoleHost::new())
        .with_debug(debug || config.run.debug)
        .with_transition_banners(config.console.transition_banners);
    driver.run(&mut engine)?;
    Ok(())
}

fn demo_machine() -> Result<Machine> {
    let options = Machine::builder()
        .transition("__start__", "pick")
        .guarded("pick", "act_one", "1")
        .guarded("pick", "act_two", "2")
        .transition("act_one", "__end__")
        .transition("act_two", "__end__")
        .build()?;

    let machine = Machine::builder()
        .transition("__start__", "__start__")
        .transition("__start__", "menu")
        .sub_machine("options", options)
        .transition("menu", "options")
        .transition("menu", "process")
        .transition("menu", "report")
        .transition("menu", "menu")
        .transition("menu", "__end__")
        .transition("options", "menu")
        .transition("process", "menu")
        .transition("report", "menu")
        .build()?;

    Ok(machine)
}

fn demo_registry() -> RoutineRegistry {
    RoutineRegistry::new()
        .register("__start__", |_| Box::new(GreetRoutine::default()))
        .register("menu", |input| Box::new(MenuRoutine::new(&input)))
        .register("options/__start__", |input| {
            let payload = input.payload.unwrap_or_else(|| json!({}));
            Box::new(script([Instruction::transition_with("pick", payload)]))
        })
        .register("options/pick", |input| Box::new(PickRoutine::new(&input)))
        .register("options/act_one", |input| {
            let user = user_name(&input);
            Box::new(script([
                Instruction::notify(format!("Performing option 1 action for {user}...")),
                Instruction::custom(
                    "option_one_task_started",
                    json!({"task_id": 123, "user": user.clone()}),
                ),
                Instruction::notify_level("success", "Option 1 action completed."),
                Instruction::parent_transition_with("menu", json!({"user_name": user})),
            ]))
        })
        .register("options/act_two", |input| {
            let user = user_name(&input);
            Box::new(script([
                Instruction::notify_level(
                    "warning",
                    format!("Initiating option 2 action for {user}... (simulating an issue)"),
                ),
                Instruction::error_with(
                    format!("Error encountered during option 2 action for {user}!"),
                    json!({"user": user.clone(), "error_code": "OPT2-ERR-500"}),
                ),
                Instruction::parent_transition_with("menu", json!({"user_name": user})),
            ]))
        })
        .register("process", |input| Box::new(ProcessRoutine::new(&input)))
        .register("report", |input| {
            let user = user_name(&input);
            Box::new(script([
                Instruction::notify(format!("Generating report for {user}...")),
                Instruction::custom(
                    "report_generated",
                    json!({"user": user, "report_type": "Summary"}),
                ),
                Instruction::notify_level("success", "Report generated."),
                Instruction::transition_with("menu", json!({"user_name": user})),
            ]))
        })
}

fn user_name(input: &RoutineInput) -> String {
    input
        .payload
        .as_ref()
        .and_then(|payload| payload.get("user_name"))
        .and_then(|value| value.as_str())
        .unwrap_or("Unknown User")
        .to_string()
}

// ============================================================================
// Routines
// ============================================================================

/// `__start__`: welcome the user and collect a name; empty input retries.
#[derive(Default)]
struct GreetRoutine {
    step: u8,
    name: String,
}

impl Routine for GreetRoutine {
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error> {
        self.step += 1;
        Ok(match self.step {
            1 => Step::Yield(Instruction::debug(
                "state_enter",
                "Entering __start__: initializing workflow",
            )),
            2 => Step::Yield(Instruction::notify("Welcome to the weft demo workflow!")),
            3 => Step::Yield(Instruction::request_input("Please enter your name:")),
            4 => {
                self.name = reply.unwrap_or_default().trim().to_string();
                if self.name.is_empty() {
                    Step::Yield(Instruction::warning("No name entered. Please try again."))
                } else {
                    Step::Yield(Instruction::notify(format!(
                        "Hello, {}! Workflow initialized.",
                        self.name
                    )))
                }
            }
            5 => {
                if self.name.is_empty() {
                    Step::Yield(Instruction::transition("__start__"))
                } else {
                    Step::Yield(Instruction::transition_with(
                        "menu",
                        json!({"user_name": self.name}),
                    ))
                }
            }
            _ => Step::Done,
        })
    }
}

#[derive(Clone)]
enum MenuChoice {
    Options,
    Process,
    Report,
    Quit,
    Invalid(String),
}

/// `menu`: dispatch on a typed command.
struct MenuRoutine {
    step: u8,
    user: String,
    choice: Option<MenuChoice>,
}

impl MenuRoutine {
    fn new(input: &RoutineInput) -> Self {
        Self {
            step: 0,
            user: user_name(input),
            choice: None,
        }
    }

    fn payload(&self) -> serde_json::Value {
        json!({"user_name": self.user})
    }
}

impl Routine for MenuRoutine {
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error> {
        self.step += 1;
        Ok(match self.step {
            1 => Step::Yield(Instruction::notify(format!(
                "Awaiting command from {}. Options: (options/process/report/quit)",
                self.user
            ))),
            2 => Step::Yield(Instruction::request_input(format!(
                "Enter command for {}:",
                self.user
            ))),
            3 => {
                let command = reply.unwrap_or_default().trim().to_lowercase();
                let choice = match command.as_str() {
                    "options" => MenuChoice::Options,
                    "process" => MenuChoice::Process,
                    "report" => MenuChoice::Report,
                    "quit" => MenuChoice::Quit,
                    other => MenuChoice::Invalid(other.to_string()),
                };
                self.choice = Some(choice.clone());
                match choice {
                    MenuChoice::Options => {
                        Step::Yield(Instruction::transition_with("options", self.payload()))
                    }
                    MenuChoice::Process => {
                        Step::Yield(Instruction::transition_with("process", self.payload()))
                    }
                    MenuChoice::Report => {
                        Step::Yield(Instruction::transition_with("report", self.payload()))
                    }
                    MenuChoice::Quit => Step::Yield(Instruction::notify(format!(
                        "Goodbye, {}! Ending workflow.",
                        self.user
                    ))),
                    MenuChoice::Invalid(ref command) => {
                        Step::Yield(Instruction::warning(format!(
                            "Invalid command: '{command}'. Please choose from the options."
                        )))
                    }
                }
            }
            4 => match self.choice.take() {
                Some(MenuChoice::Quit) => Step::Yield(Instruction::transition("__end__")),
                Some(MenuChoice::Invalid(_)) => {
                    Step::Yield(Instruction::transition_with("menu", self.payload()))
                }
                _ => Step::Done,
            },
            _ => Step::Done,
        })
    }
}

/// `options/pick`: choose an option action or go back to the menu.
struct PickRoutine {
    step: u8,
    user: String,
}

impl PickRoutine {
    fn new(input: &RoutineInput) -> Self {
        Self {
            step: 0,
            user: user_name(input),
        }
    }
}

impl Routine for PickRoutine {
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error> {
        self.step += 1;
        Ok(match self.step {
            1 => Step::Yield(Instruction::notify(
                "Option actions: (1) run task (2) simulate failure (back)",
            )),
            2 => Step::Yield(Instruction::request_input("Choose an option:")),
            3 => {
                let payload = json!({"user_name": self.user});
                match reply.unwrap_or_default().trim() {
                    "1" => Step::Yield(Instruction::transition_with("act_one", payload)),
                    "2" => Step::Yield(Instruction::transition_with("act_two", payload)),
                    _ => Step::Yield(Instruction::parent_transition_with("menu", payload)),
                }
            }
            _ => Step::Done,
        })
    }
}

/// `process`: mock file processing with confirmation.
struct ProcessRoutine {
    step: u8,
    user: String,
    file: String,
}

impl ProcessRoutine {
    fn new(input: &RoutineInput) -> Self {
        Self {
            step: 0,
            user: user_name(input),
            file: String::new(),
        }
    }
}

impl Routine for ProcessRoutine {
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error> {
        self.step += 1;
        Ok(match self.step {
            1 => Step::Yield(Instruction::notify(format!(
                "Starting data processing for {}...",
                self.user
            ))),
            2 => Step::Yield(Instruction::request_input("Enter data file name:")),
            3 => {
                self.file = reply.unwrap_or_default().trim().to_string();
                if self.file.is_empty() {
                    Step::Yield(Instruction::notify_level(
                        "warning",
                        "No file name provided. Aborting process.",
                    ))
                } else {
                    Step::Yield(Instruction::notify_level(
                        "success",
                        format!("File '{}' processed.", self.file),
                    ))
                }
            }
            4 => {
                if self.file.is_empty() {
                    Step::Yield(Instruction::transition_with(
                        "menu",
                        json!({"user_name": self.user}),
                    ))
                } else {
                    Step::Yield(Instruction::custom(
                        "file_processed",
                        json!({"file": self.file, "processed_records": 150}),
                    ))
                }
            }
            5 => Step::Yield(Instruction::request_input(format!(
                "Review result for '{}' (ok/retry):",
                self.file
            ))),
            6 => {
                let confirmed = reply.unwrap_or_default().trim().eq_ignore_ascii_case("ok");
                if confirmed {
                    Step::Yield(Instruction::notify("Processing confirmed."))
                } else {
                    Step::Yield(Instruction::notify_level(
                        "warning",
                        "Result not accepted. Returning to menu.",
                    ))
                }
            }
            7 => Step::Yield(Instruction::transition_with(
                "menu",
                json!({"user_name": self.user}),
            )),
            _ => Step::Done,
        })
    }
}
