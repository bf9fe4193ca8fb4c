//! Sample recipes and scripts.

/// Writes `%A%` into the cache dir. `A` defaults to "1".
pub const PRECEDENCE_RECIPE: &str = r#"
Description = "Writes the value of A"

[Input]
IDENTIFIER = "com.example.precedence"
A = "1"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/value.txt"
file_content = "%A%"
"#;

/// Second step fails, third must never run.
pub const FAILING_RECIPE: &str = r#"
[Input]
IDENTIFIER = "com.example.failing"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/first.txt"
file_content = "first"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/missing-dir/second.txt"
file_content = "second"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/third.txt"
file_content = "third"
"#;

/// Stops after the predicate, so `after.txt` is never written.
pub const STOPPING_RECIPE: &str = r#"
[Input]
IDENTIFIER = "com.example.stopping"
MODE = "skip"

[[Process]]
Processor = "EndOfCheckPhase"

[[Process]]
Processor = "StopProcessingIf"
[Process.Arguments]
predicate = 'MODE == "skip"'

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/after.txt"
file_content = "after"
"#;

/// Uses a colocated `Greeter.rhai`, then writes what it produced.
pub const SCRIPT_RECIPE: &str = r#"
[Input]
IDENTIFIER = "com.example.greeter"
name = "world"

[[Process]]
Processor = "Greeter"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/greeting.txt"
file_content = "%greeting%"
"#;

pub const GREETER_SCRIPT: &str = r#"
let description = "Greets someone";
let input_variables = #{
    name: #{ required: true, description: "Who to greet" },
};
let output_variables = #{
    greeting: #{ description: "The greeting" },
};

fn process(env) {
    log(`greeting ${env.name}`);
    env.greeting = `hello ${env.name}`;
    env
}
"#;

/// Declares an output it never sets.
pub const LYING_SCRIPT: &str = r#"
let output_variables = #{
    version: #{ description: "Never set" },
};

fn process(env) {
    env
}
"#;

pub const LYING_RECIPE: &str = r#"
[Input]
IDENTIFIER = "com.example.lying"

[[Process]]
Processor = "Liar"
"#;

pub const JSON_RECIPE: &str = r#"{
    "Description": "JSON flavored",
    "Input": { "IDENTIFIER": "com.example.json", "COUNT": 3 },
    "Process": [
        { "Processor": "EndOfCheckPhase" }
    ]
}"#;

/// The second step relies on `file_content` from the first step's arguments.
pub const SHARED_ARGUMENT_RECIPE: &str = r#"
[Input]
IDENTIFIER = "com.example.shared"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/first.txt"
file_content = "shared"

[[Process]]
Processor = "FileCreator"
[Process.Arguments]
file_path = "%RECIPE_CACHE_DIR%/second.txt"
"#;
