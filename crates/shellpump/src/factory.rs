use shellpump_core::{ProcessLifecycle, ProcessManagerFactory};

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformProcessManagerFactory;

impl ProcessManagerFactory for PlatformProcessManagerFactory {
    #[cfg(unix)]
    type Manager = shellpump_unix::UnixProcessManager;

    #[cfg(windows)]
    type Manager = shellpump_windows::WindowsProcessManager;

    fn create_process_manager() -> Self::Manager {
        #[cfg(unix)]
        return shellpump_unix::UnixProcessManagerFactory::create_process_manager();

        #[cfg(windows)]
        return shellpump_windows::WindowsProcessManagerFactory::create_process_manager();
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return shellpump_unix::UnixProcessManagerFactory::platform_name();

        #[cfg(windows)]
        return shellpump_windows::WindowsProcessManagerFactory::platform_name();
    }
}

#[cfg(not(any(unix, windows)))]
compile_error!("Unsupported platform: only Unix and Windows are currently supported");

/// Process handle type of the current platform
pub type PlatformHandle =
    <<PlatformProcessManagerFactory as ProcessManagerFactory>::Manager as ProcessLifecycle>::Handle;
