mod projects;
mod sessions;
