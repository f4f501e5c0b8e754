//! Concrete release steps for one repository
//!
//! Each step is written to be re-run after a crash. Where the underlying tool
//! would reject a repeat (nothing to commit, tag exists, release exists) the
//! step checks first and reports the no-op instead of failing.

use crate::ci::github::{NewRelease, ReleaseHost};
use crate::ci::validator::{PollLimits, TriggerKind, WorkflowValidator};
use crate::ci::workflows::discover_triggers;
use crate::core::error::{PreconditionError, PublishError, PublishResult, ResultExt};
use crate::core::plan::{PlannedRepository, PublishPlan};
use crate::core::vcs::{Applied, SystemGit};
use crate::publish::manifest::update_manifest;
use crate::publish::release::release_title;
use crate::publish::sequencer::StepRunner;
use crate::publish::step::StepId;
use crate::utils::{github_slug_from_url, split_slug};
use std::process::Command;

pub struct RepositoryPublisher<'a, H: ReleaseHost> {
  plan: &'a PublishPlan,
  repo: &'a PlannedRepository,
  git: SystemGit,
  host: &'a H,
}

impl<'a, H: ReleaseHost> RepositoryPublisher<'a, H> {
  /// Open the repository's checkout
  pub fn open(plan: &'a PublishPlan, repo: &'a PlannedRepository, host: &'a H) -> PublishResult<Self> {
    let mut git =
      SystemGit::open(&repo.path).with_context(|| format!("Failed to open repository '{}'", repo.name))?;
    // release.toml may live inside a repository being released
    git.exclude_path(&plan.progress_file);
    Ok(Self { plan, repo, git, host })
  }

  /// `(owner, repo)` on GitHub, from config or the push remote's URL
  fn github_slug(&self) -> PublishResult<(String, String)> {
    let slug = match &self.repo.github {
      Some(slug) => slug.clone(),
      None => {
        let url = self.git.remote_url(&self.plan.remote)?.unwrap_or_default();
        github_slug_from_url(&url).ok_or_else(|| {
          PublishError::with_help(
            format!(
              "Cannot determine the GitHub repository for '{}' from remote '{}' ({})",
              self.repo.name, self.plan.remote, url
            ),
            "Set `github = \"owner/repo\"` for this repository in release.toml.",
          )
        })?
      }
    };

    let (owner, name) =
      split_slug(&slug).ok_or_else(|| PublishError::message(format!("Invalid GitHub slug '{}'", slug)))?;
    Ok((owner.to_string(), name.to_string()))
  }

  /// Commit the release tag points at (HEAD if the tag is missing)
  fn release_sha(&self) -> PublishResult<String> {
    match self.git.tag_target(&self.plan.tag_name())? {
      Some(sha) => Ok(sha),
      None => self.git.head_commit(),
    }
  }

  fn update_manifest(&self) -> PublishResult<()> {
    let version = self.plan.version.to_string();
    let rewritten = update_manifest(self.git.work_tree(), &version, &self.plan.dependency_prefix())?;
    println!("   Set version {}", version);
    for name in rewritten {
      println!("   Bumped {} to ^{}", name, version);
    }
    Ok(())
  }

  fn install_dependencies(&self) -> PublishResult<()> {
    let (program, args) = self
      .plan
      .package_manager
      .split_first()
      .ok_or_else(|| PublishError::message("No package manager command configured"))?;

    let output = Command::new(program)
      .args(args)
      .current_dir(self.git.work_tree())
      .output()
      .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PublishError::message(format!(
        "`{}` exited with {}:\n{}",
        self.plan.package_manager.join(" "),
        output.status,
        stderr.trim()
      )));
    }

    println!("   Installed dependencies");
    Ok(())
  }

  fn commit(&self) -> PublishResult<()> {
    match self.git.commit_all(&self.plan.commit_message())? {
      Applied::Changed => println!("   Committed \"{}\"", self.plan.commit_message()),
      Applied::AlreadyDone => println!("   Nothing to commit"),
    }
    Ok(())
  }

  fn tag(&self) -> PublishResult<()> {
    let tag = self.plan.tag_name();
    match self.git.create_tag(&tag, &release_title(&self.plan.version))? {
      Applied::Changed => println!("   Created tag {}", tag),
      Applied::AlreadyDone => println!("   Tag {} already at HEAD", tag),
    }
    Ok(())
  }

  fn push(&self) -> PublishResult<()> {
    let tag = self.plan.tag_name();
    self.git.push_release(&self.plan.remote, &self.plan.branch, &tag)?;
    println!("   Pushed {} and {} to {}", self.plan.branch, tag, self.plan.remote);
    Ok(())
  }

  fn create_release(&self) -> PublishResult<()> {
    let (owner, name) = self.github_slug()?;
    let tag = self.plan.tag_name();

    if let Some(existing) = self.host.find_release(&owner, &name, &tag)? {
      println!("   Release for {} already exists (id {})", existing.tag_name, existing.id);
      return Ok(());
    }

    let release = NewRelease {
      tag_name: tag,
      name: release_title(&self.plan.version),
      prerelease: self.plan.is_prerelease(),
      draft: false,
    };
    let created = self.host.create_release(&owner, &name, &release)?;
    println!(
      "   Created {}release \"{}\"{}",
      if created.prerelease { "pre-" } else { "" },
      release.name,
      created.html_url.map(|u| format!(" ({})", u)).unwrap_or_default()
    );
    Ok(())
  }

  fn validate_workflow(&self, kind: TriggerKind) -> PublishResult<()> {
    let triggers = discover_triggers(self.git.work_tree(), &self.plan.branch)?;
    let declared = match kind {
      TriggerKind::Push => triggers.push,
      TriggerKind::Release => triggers.release_published,
    };
    if !declared {
      println!("   No {} workflow declared, skipping validation", kind.event());
      return Ok(());
    }

    let (owner, name) = self.github_slug()?;
    let sha = self.release_sha()?;
    let validator = WorkflowValidator::new(self.host, PollLimits::from(&self.plan.validation));
    validator.validate(&owner, &name, &sha, kind)?;
    Ok(())
  }
}

impl<H: ReleaseHost> StepRunner for RepositoryPublisher<'_, H> {
  fn check_preconditions(&mut self, resuming: bool) -> PublishResult<()> {
    let branch = self.git.current_branch()?;
    if branch != self.plan.branch {
      return Err(PublishError::Precondition(PreconditionError::WrongBranch {
        repository: self.repo.name.clone(),
        expected: self.plan.branch.clone(),
        actual: branch,
      }));
    }

    // A resumed repository is expected to carry its own half-finished changes
    if !resuming && !self.plan.ignore_uncommitted && !self.git.is_clean()? {
      return Err(PublishError::Precondition(PreconditionError::UncommittedChanges {
        repository: self.repo.name.clone(),
      }));
    }

    Ok(())
  }

  fn run_step(&mut self, step: StepId) -> PublishResult<()> {
    println!("▶ {}: {}", self.repo.name, step);
    match step {
      StepId::UpdateManifest => self.update_manifest(),
      StepId::InstallDependencies => self.install_dependencies(),
      StepId::Commit => self.commit(),
      StepId::Tag => self.tag(),
      StepId::Push => self.push(),
      StepId::ValidatePushWorkflow => self.validate_workflow(TriggerKind::Push),
      StepId::CreateRelease => self.create_release(),
      StepId::ValidateReleaseWorkflow => self.validate_workflow(TriggerKind::Release),
    }
  }
}
