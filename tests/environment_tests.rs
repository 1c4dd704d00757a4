mod common;

#[cfg(test)]
mod tests {
    use super::common::{FakeTools, Project};
    use batcave_cicd::environment::EnvironmentPreparer;
    use batcave_cicd::platform::host_for;
    use std::fs;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_prepare_twice_reuses_environment() {
        let project = Project::new();
        let settings = project.settings();
        let platform = host_for("linux").unwrap();
        let tools = FakeTools::new();
        let preparer = EnvironmentPreparer::new(
            platform.as_ref(),
            &tools,
            project.root(),
            settings.requirements.clone(),
        );

        let first = preparer.prepare(&settings.venv_dir, false).await.unwrap();
        let second = preparer.prepare(&settings.venv_dir, false).await.unwrap();

        assert_eq!(first, second);
        assert!(second.is_active());
        assert_eq!(second.root(), settings.venv_dir.as_path());
        assert_eq!(second.python(), settings.venv_dir.join("bin/python").as_path());

        let creations = tools
            .calls()
            .iter()
            .filter(|c| c.contains("-m venv"))
            .count();
        assert_eq!(creations, 1);
    }

    #[tokio::test]
    async fn test_skip_dependencies_only_creates() {
        let project = Project::new();
        fs::write(project.root().join("requirements.txt"), "pylint\n").unwrap();
        let platform = host_for("linux").unwrap();
        let tools = FakeTools::new();
        let preparer = EnvironmentPreparer::new(
            platform.as_ref(),
            &tools,
            project.root(),
            vec![PathBuf::from("requirements.txt")],
        );

        let venv = project.root().join(".venv");
        preparer.prepare(&venv, true).await.unwrap();
        assert_eq!(tools.calls().len(), 1);
        assert!(EnvironmentPreparer::<&FakeTools>::exists(&venv));
    }

    #[tokio::test]
    async fn test_existing_requirements_are_installed() {
        let project = Project::new();
        fs::write(project.root().join("requirements.txt"), "pylint\n").unwrap();
        let platform = host_for("linux").unwrap();
        let tools = FakeTools::new();
        let preparer = EnvironmentPreparer::new(
            platform.as_ref(),
            &tools,
            project.root(),
            vec![
                PathBuf::from("requirements.txt"),
                PathBuf::from("requirements-dev.txt"),
            ],
        );

        preparer
            .prepare(&project.root().join(".venv"), false)
            .await
            .unwrap();

        let installs: Vec<String> = tools
            .calls()
            .into_iter()
            .filter(|c| c.contains("-r "))
            .collect();
        assert_eq!(installs.len(), 1);
        assert!(installs[0].ends_with("requirements.txt"));
    }

    #[tokio::test]
    async fn test_failed_creation_is_reported() {
        let project = Project::new();
        let platform = host_for("linux").unwrap();
        let tools = FakeTools::failing_at(0);
        let preparer =
            EnvironmentPreparer::new(platform.as_ref(), &tools, project.root(), Vec::new());

        let venv = project.root().join(".venv");
        assert!(preparer.prepare(&venv, false).await.is_err());
        assert!(!venv.exists());
    }
}
