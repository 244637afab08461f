//! Vulkan context: instance, surface, physical device, logical device, queues.

use ash::khr::{surface, swapchain};
use ash::{vk, Device, Entry, Instance};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use super::{ENGINE_NAME, ENGINE_VERSION, REQUIRED_VK_VERSION};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Queue family indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Main Vulkan context holding all core Vulkan objects.
///
/// The context owns the presentation surface as well: the surface must be
/// destroyed after everything that renders to it and before the instance,
/// which is exactly the context's drop order.
pub struct VulkanContext {
    pub entry: Entry,
    pub instance: Instance,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_families: QueueFamilyIndices,

    // Queues
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    // Extension loaders
    pub surface_loader: surface::Instance,
    pub swapchain_loader: swapchain::Device,

    pub device_properties: vk::PhysicalDeviceProperties,

    // Debug messenger (present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
}

impl VulkanContext {
    /// Create a new Vulkan context for the given window.
    ///
    /// Runs the full bring-up sequence: instance (with validation layers when
    /// requested and available), debug messenger, surface, physical device
    /// selection, logical device and queues.
    ///
    /// # Safety
    /// The window handles must be valid and outlive the context.
    pub unsafe fn new(
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        app_name: &str,
        enable_validation: bool,
    ) -> Result<Self, String> {
        let entry = Entry::load().map_err(|e| format!("Failed to load Vulkan: {}", e))?;

        // Check Vulkan version
        let api_version = match entry
            .try_enumerate_instance_version()
            .map_err(|e| format!("Failed to enumerate instance version: {:?}", e))?
        {
            Some(version) => version,
            None => vk::API_VERSION_1_0,
        };

        if api_version < REQUIRED_VK_VERSION {
            return Err(format!(
                "Vulkan 1.3 required, but only {}.{}.{} available",
                vk::api_version_major(api_version),
                vk::api_version_minor(api_version),
                vk::api_version_patch(api_version)
            ));
        }

        // Requesting a layer the loader does not know is an instance-creation
        // error, so downgrade to no-validation instead.
        let validation = enable_validation && Self::validation_layer_available(&entry)?;
        if enable_validation && !validation {
            log::warn!("validation layers requested but VK_LAYER_KHRONOS_validation is not installed");
        }

        let instance = Self::create_instance(&entry, display_handle, app_name, validation)?;

        let (debug_utils_loader, debug_messenger) = if validation {
            Self::setup_debug_messenger(&entry, &instance)?
        } else {
            (None, None)
        };

        let surface_loader = surface::Instance::new(&entry, &instance);

        let surface = ash_window::create_surface(&entry, &instance, display_handle, window_handle, None)
            .map_err(|e| format!("Failed to create Vulkan surface: {:?}", e))?;

        // Select physical device against the real surface so the present
        // family is the one that can actually present to it.
        let (physical_device, queue_families) =
            Self::pick_physical_device(&instance, &surface_loader, surface)?;

        let device_properties = instance.get_physical_device_properties(physical_device);

        let (device, graphics_queue, present_queue) =
            Self::create_logical_device(&instance, physical_device, &queue_families)?;

        let swapchain_loader = swapchain::Device::new(&instance, &device);

        Ok(Self {
            entry,
            instance,
            surface,
            physical_device,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            surface_loader,
            swapchain_loader,
            device_properties,
            debug_messenger,
            debug_utils_loader,
        })
    }

    /// Check whether the Khronos validation layer is installed.
    unsafe fn validation_layer_available(entry: &Entry) -> Result<bool, String> {
        let layers = entry
            .enumerate_instance_layer_properties()
            .map_err(|e| format!("Failed to enumerate instance layers: {:?}", e))?;
        Ok(layers
            .iter()
            .any(|props| CStr::from_ptr(props.layer_name.as_ptr()) == VALIDATION_LAYER))
    }

    /// Create the Vulkan instance with the required extensions.
    unsafe fn create_instance(
        entry: &Entry,
        display_handle: RawDisplayHandle,
        app_name: &str,
        enable_validation: bool,
    ) -> Result<Instance, String> {
        let app_name = CString::new(app_name).map_err(|e| format!("Invalid app name: {}", e))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(ENGINE_VERSION)
            .api_version(REQUIRED_VK_VERSION);

        // Surface extensions required by the windowing system
        let mut extensions = ash_window::enumerate_required_extensions(display_handle)
            .map_err(|e| format!("Failed to get required extensions: {:?}", e))?
            .to_vec();

        if enable_validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        for &ext in &extensions {
            log::debug!("instance extension: {:?}", CStr::from_ptr(ext));
        }

        let layer_names: Vec<*const c_char> = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        entry
            .create_instance(&create_info, None)
            .map_err(|e| format!("Failed to create Vulkan instance: {:?}", e))
    }

    /// Install the debug messenger routing validation output into `log`.
    unsafe fn setup_debug_messenger(
        entry: &Entry,
        instance: &Instance,
    ) -> Result<
        (
            Option<ash::ext::debug_utils::Instance>,
            Option<vk::DebugUtilsMessengerEXT>,
        ),
        String,
    > {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&create_info, None)
            .map_err(|e| format!("Failed to create debug messenger: {:?}", e))?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    /// Select the best physical device that can render to the surface.
    unsafe fn pick_physical_device(
        instance: &Instance,
        surface_loader: &surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilyIndices), String> {
        let devices = instance
            .enumerate_physical_devices()
            .map_err(|e| format!("Failed to enumerate physical devices: {:?}", e))?;

        if devices.is_empty() {
            return Err("No Vulkan-capable GPU found".to_string());
        }

        let mut scored_devices: Vec<_> = devices
            .iter()
            .filter_map(|&device| {
                let score = Self::rate_device(instance, device, surface_loader, surface);
                if score > 0 {
                    Some((device, score))
                } else {
                    None
                }
            })
            .collect();

        scored_devices.sort_by(|a, b| b.1.cmp(&a.1));

        let &(physical_device, _) = scored_devices
            .first()
            .ok_or("No suitable GPU found".to_string())?;

        let queue_families =
            Self::find_queue_families(instance, physical_device, surface_loader, surface);

        let props = instance.get_physical_device_properties(physical_device);
        let name = CStr::from_ptr(props.device_name.as_ptr()).to_string_lossy();
        log::info!("selected GPU: {}", name);

        Ok((physical_device, queue_families))
    }

    /// Rate a physical device (higher is better; 0 = unusable).
    unsafe fn rate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface_loader: &surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> u32 {
        let queue_families =
            Self::find_queue_families(instance, device, surface_loader, surface);
        if !queue_families.is_complete() {
            return 0;
        }

        if !Self::supports_swapchain_extension(instance, device) {
            return 0;
        }

        // The swapchain must have at least one format and present mode to
        // work with.
        let formats = surface_loader
            .get_physical_device_surface_formats(device, surface)
            .unwrap_or_default();
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(device, surface)
            .unwrap_or_default();
        if formats.is_empty() || present_modes.is_empty() {
            return 0;
        }

        let props = instance.get_physical_device_properties(device);
        let mut score = 1u32;

        // Prefer discrete GPU
        if props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += 10000;
        } else if props.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            score += 1000;
        }

        // Add VRAM size to score
        let memory_props = instance.get_physical_device_memory_properties(device);
        for i in 0..memory_props.memory_heap_count as usize {
            let heap = memory_props.memory_heaps[i];
            if heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL) {
                score += (heap.size / (1024 * 1024)) as u32; // MB of VRAM
            }
        }

        score
    }

    /// Check for VK_KHR_swapchain support.
    unsafe fn supports_swapchain_extension(
        instance: &Instance,
        device: vk::PhysicalDevice,
    ) -> bool {
        let extensions = match instance.enumerate_device_extension_properties(device) {
            Ok(ext) => ext,
            Err(_) => return false,
        };
        extensions
            .iter()
            .any(|e| CStr::from_ptr(e.extension_name.as_ptr()) == swapchain::NAME)
    }

    /// Find queue family indices for a physical device.
    unsafe fn find_queue_families(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface_loader: &surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> QueueFamilyIndices {
        let queue_families = instance.get_physical_device_queue_family_properties(device);

        let mut indices = QueueFamilyIndices::default();

        for (i, family) in queue_families.iter().enumerate() {
            let i = i as u32;

            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(i);
            }

            let supports_present = surface_loader
                .get_physical_device_surface_support(device, i, surface)
                .unwrap_or(false);
            if supports_present {
                indices.present = Some(i);
            }

            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    /// Create the logical device with one queue per unique family.
    unsafe fn create_logical_device(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: &QueueFamilyIndices,
    ) -> Result<(Device, vk::Queue, vk::Queue), String> {
        let graphics_family = queue_families.graphics.ok_or("No graphics queue family")?;
        let present_family = queue_families.present.ok_or("No present queue family")?;

        let mut unique_families = vec![graphics_family];
        if !unique_families.contains(&present_family) {
            unique_families.push(present_family);
        }

        let queue_priorities = [1.0f32];
        let queue_create_infos: Vec<_> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let extensions: Vec<*const c_char> = vec![swapchain::NAME.as_ptr()];

        // No optional device features are needed for a single fixed pipeline.
        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&device_features);

        let device = instance
            .create_device(physical_device, &create_info, None)
            .map_err(|e| format!("Failed to create logical device: {:?}", e))?;

        let graphics_queue = device.get_device_queue(graphics_family, 0);
        let present_queue = device.get_device_queue(present_family, 0);

        Ok((device, graphics_queue, present_queue))
    }

    /// True when graphics and present run on the same queue family.
    pub fn unified_queue_family(&self) -> bool {
        self.queue_families.graphics == self.queue_families.present
    }

    /// Wait for all device operations to complete.
    pub fn wait_idle(&self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.wait_idle();

            self.device.destroy_device(None);

            self.surface_loader.destroy_surface(self.surface, None);

            if let (Some(loader), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Debug callback for validation layers.
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _ty: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("validation layer: {}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("validation layer: {}", message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_indices_incomplete_by_default() {
        assert!(!QueueFamilyIndices::default().is_complete());
    }

    #[test]
    fn test_queue_family_indices_complete_needs_both() {
        let graphics_only = QueueFamilyIndices {
            graphics: Some(0),
            present: None,
        };
        assert!(!graphics_only.is_complete());

        let both = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(2),
        };
        assert!(both.is_complete());
    }
}
