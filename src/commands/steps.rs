use crate::publish::StepId;

/// Print the fixed step order
pub fn run_steps() {
  println!("📋 Release steps (run in order for every repository)\n");
  for (i, step) in StepId::ALL.iter().enumerate() {
    println!("  {}. {:<28} {}", i + 1, step.name(), step.describe());
  }
}
