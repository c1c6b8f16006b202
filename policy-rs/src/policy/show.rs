use super::inst::{PolicyManager, ShowCallback};
use super::{community, prefix, route_map};

impl PolicyManager {
    fn show_add(&mut self, path: &str, cb: ShowCallback) {
        self.show_cb.insert(path.to_string(), cb);
    }

    pub fn show_build(&mut self) {
        self.show_add("/show/prefix-list", prefix::show::prefix_list);
        self.show_add("/show/community-list", community::show::community_list);
        self.show_add("/show/route-map", route_map::show::route_map);
        self.show_add("/show/dangling", route_map::show::dangling);
    }
}
